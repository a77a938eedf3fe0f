//! Core type definitions for EMA

use crate::core::{EmaError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default boost value
pub const DEFAULT_BOOST: f64 = 0.15;
/// Default margin threshold
pub const DEFAULT_MARGIN: f64 = 0.15;
/// Default threshold below which weights are dropped
pub const DEFAULT_PRUNE_THRESHOLD: f64 = 0.01;

/// Number of top-ranked classes checked for the R5 measure
pub const TOP_K: usize = 5;

/// Sparse feature vector with sorted indices and a logical length
///
/// Repeated indices are summed on construction and exact zeros are dropped,
/// so every stored value is an active feature's intensity.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    indices: Vec<usize>,
    values: Vec<f64>,
    dim: usize,
}

impl FeatureVector {
    /// Create a new feature vector, sorting indices and summing duplicates
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        // Stable sort keeps the summation order of duplicates deterministic
        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(pairs.len());
        for (idx, value) in pairs {
            match merged.last_mut() {
                Some((last, acc)) if *last == idx => *acc += value,
                _ => merged.push((idx, value)),
            }
        }
        merged.retain(|&(_, value)| value != 0.0);

        let dim = merged.last().map_or(0, |&(idx, _)| idx + 1);
        let (indices, values) = merged.into_iter().unzip();
        Self {
            indices,
            values,
            dim,
        }
    }

    /// Create a binary feature vector where every listed index has intensity 1.0
    pub fn from_indices(indices: &[usize]) -> Self {
        Self::new(indices.to_vec(), vec![1.0; indices.len()])
    }

    /// Create an empty feature vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
            dim: 0,
        }
    }

    /// Widen the logical length to at least `dim`
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = self.dim.max(dim);
        self
    }

    /// Logical length of the vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Sorted indices of the active features
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Intensities matching [`indices`](Self::indices)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over `(index, value)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Copy of this vector restricted to indices below `len`, with length `len`
    pub fn cropped(&self, len: usize) -> Self {
        let (indices, values) = self.iter().filter(|&(idx, _)| idx < len).unzip();
        Self {
            indices,
            values,
            dim: len,
        }
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector has no active features
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Check that every intensity is finite and non-negative
    pub fn validate(&self) -> Result<()> {
        match self.iter().find(|&(_, v)| !v.is_finite() || v < 0.0) {
            Some((idx, value)) => Err(EmaError::InvalidFeature(format!(
                "feature {idx} has intensity {value}, expected a finite non-negative value"
            ))),
            None => Ok(()),
        }
    }
}

/// A single labelled event of the stream
///
/// Both the label and the feature ids are 1-based, as produced by a featurizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example {
    /// True class (>= 1)
    pub label: usize,
    /// Active feature ids (>= 1)
    pub features: Vec<usize>,
}

impl Example {
    /// Create a new example
    pub fn new(label: usize, features: Vec<usize>) -> Self {
        Self { label, features }
    }

    /// Largest feature id of the example (0 if it has none)
    pub fn max_feature(&self) -> usize {
        self.features.iter().copied().max().unwrap_or(0)
    }

    /// Build the 0-based binary feature vector for this example
    pub fn to_features(&self) -> Result<FeatureVector> {
        if self.label == 0 {
            return Err(EmaError::InvalidLabel(self.label));
        }
        if self.features.contains(&0) {
            return Err(EmaError::InvalidFeature(
                "feature ids must be positive".to_string(),
            ));
        }
        let indices: Vec<usize> = self.features.iter().map(|&f| f - 1).collect();
        Ok(FeatureVector::from_indices(&indices))
    }
}

/// Per-example result of the online evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// True class
    pub label: usize,
    /// Top-ranked class, 0 when there was no prediction
    pub predicted: usize,
    /// True class ranked first
    pub r1: bool,
    /// True class within the top five
    pub r5: bool,
}

impl Outcome {
    /// Score a ranking (best class first) against the true label
    pub fn from_ranking(label: usize, ranking: &[usize]) -> Self {
        let predicted = ranking.first().copied().unwrap_or(0);
        let r1 = predicted == label;
        let r5 = ranking.iter().take(TOP_K).any(|&class| class == label);
        Self {
            label,
            predicted,
            r1,
            r5,
        }
    }
}

/// Hyperparameters of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaConfig {
    /// Boost value, controls decay of active features (0 < b <= 1)
    pub boost: f64,
    /// Margin threshold below which an update fires
    pub margin: f64,
    /// Absolute value below which weights are dropped
    pub prune_threshold: f64,
    /// Optional pre-sizing of the weight matrix as (features, classes)
    pub initial_shape: Option<(usize, usize)>,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            boost: DEFAULT_BOOST,
            margin: DEFAULT_MARGIN,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            initial_shape: None,
        }
    }
}

impl EmaConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(EmaError::IoError)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| EmaError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.boost > 0.0 && self.boost <= 1.0) {
            return Err(EmaError::InvalidParameter(format!(
                "boost must be in (0, 1], got {}",
                self.boost
            )));
        }
        if !self.margin.is_finite() {
            return Err(EmaError::InvalidParameter(format!(
                "margin must be finite, got {}",
                self.margin
            )));
        }
        if !self.prune_threshold.is_finite() || self.prune_threshold < 0.0 {
            return Err(EmaError::InvalidParameter(format!(
                "prune threshold must be finite and non-negative, got {}",
                self.prune_threshold
            )));
        }
        Ok(())
    }
}
