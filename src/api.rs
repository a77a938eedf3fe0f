//! High-level API for online evaluation runs
//!
//! This module wires readers, the EMA classifier and outcome sinks together
//! for the common case of evaluating one input file.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ema::api::OnlineSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = OnlineSession::new()
//!     .with_boost(0.15)
//!     .with_margin(0.15)
//!     .run_file("commands.sparse", ())?;
//!
//! println!("R1 = {:.3}, R5 = {:.3}", result.summary.mean_r1(), result.summary.mean_r5());
//! # Ok(())
//! # }
//! ```

use crate::classifier::Ema;
use crate::core::{EmaConfig, Example, OutcomeSink, Result};
use crate::data::{GreenbergFeaturizer, SparseDatasetReader};
use crate::evaluation::{EvaluationSummary, OnlineEvaluator};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Builder for a single predict-then-learn run
#[derive(Debug, Clone, Default)]
pub struct OnlineSession {
    config: EmaConfig,
    limit: Option<usize>,
}

impl OnlineSession {
    /// Create a session with default hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all hyperparameters at once
    pub fn with_config(mut self, config: EmaConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the decay/boost rate b
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.config.boost = boost;
        self
    }

    /// Set the margin threshold d
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.config.margin = margin;
        self
    }

    /// Set the pruning threshold
    pub fn with_prune_threshold(mut self, threshold: f64) -> Self {
        self.config.prune_threshold = threshold;
        self
    }

    /// Pre-size the weight matrix
    pub fn with_initial_shape(mut self, rows: usize, cols: usize) -> Self {
        self.config.initial_shape = Some((rows, cols));
        self
    }

    /// Stop after `limit` examples
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn config(&self) -> &EmaConfig {
        &self.config
    }

    /// Build an evaluator with a fresh classifier
    pub fn evaluator(&self) -> Result<OnlineEvaluator> {
        Ok(OnlineEvaluator::new(self.config.clone())?.with_limit(self.limit))
    }

    /// Evaluate a stream of examples
    pub fn run<I, S>(&self, examples: I, sink: S) -> Result<SessionResult>
    where
        I: IntoIterator<Item = Result<Example>>,
        S: OutcomeSink,
    {
        let mut evaluator = self.evaluator()?;
        let summary = evaluator.run(examples, sink)?;
        Ok(SessionResult {
            summary,
            classifier: evaluator.into_classifier(),
        })
    }

    /// Evaluate an encoded sparse dataset file
    pub fn run_file<P, S>(&self, path: P, sink: S) -> Result<SessionResult>
    where
        P: AsRef<Path>,
        S: OutcomeSink,
    {
        self.run(SparseDatasetReader::from_file(path)?, sink)
    }

    /// Featurize and evaluate a Greenberg command log
    ///
    /// New classes and features are added to `featurizer`, so its vocabulary
    /// can decode the run's predictions afterwards.
    pub fn run_greenberg_file<P, S>(
        &self,
        path: P,
        featurizer: &mut GreenbergFeaturizer,
        sink: S,
    ) -> Result<SessionResult>
    where
        P: AsRef<Path>,
        S: OutcomeSink,
    {
        let file = File::open(path)?;
        self.run(featurizer.encode(BufReader::new(file)), sink)
    }
}

/// Summary and final classifier of a finished run
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub summary: EvaluationSummary,
    pub classifier: Ema,
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Evaluate a sparse dataset with default hyperparameters
    pub fn evaluate_file<P: AsRef<Path>>(path: P) -> Result<EvaluationSummary> {
        Ok(OnlineSession::new().run_file(path, ())?.summary)
    }

    /// Evaluate a Greenberg log with default hyperparameters
    pub fn evaluate_greenberg_file<P: AsRef<Path>>(path: P) -> Result<EvaluationSummary> {
        let mut featurizer = GreenbergFeaturizer::new();
        Ok(OnlineSession::new()
            .run_greenberg_file(path, &mut featurizer, ())?
            .summary)
    }

    /// Evaluate in-memory `(class, feature ids)` pairs
    pub fn evaluate_pairs(pairs: &[(usize, Vec<usize>)]) -> Result<EvaluationSummary> {
        let examples = pairs
            .iter()
            .map(|(label, features)| Ok(Example::new(*label, features.clone())));
        Ok(OnlineSession::new().run(examples, ())?.summary)
    }
}
