//! Online predict-then-learn evaluation
//!
//! Every example is first predicted with the weights left by the previous
//! example and only then learned from, so the R1/R5 measures reflect genuine
//! online generalization.

use crate::classifier::Ema;
use crate::core::{EmaConfig, Example, OnlineClassifier, Outcome, OutcomeSink, Result};
use log::debug;

/// Drives a stream of examples through a classifier
pub struct OnlineEvaluator<C: OnlineClassifier = Ema> {
    classifier: C,
    limit: Option<usize>,
    feature_dim: usize,
}

impl OnlineEvaluator<Ema> {
    /// Create an evaluator around a fresh EMA classifier
    pub fn new(config: EmaConfig) -> Result<Self> {
        Ok(Self::with_classifier(Ema::new(config)?))
    }
}

impl<C: OnlineClassifier> OnlineEvaluator<C> {
    /// Create an evaluator around an existing classifier
    pub fn with_classifier(classifier: C) -> Self {
        let feature_dim = classifier.feature_dim();
        Self {
            classifier,
            limit: None,
            feature_dim,
        }
    }

    /// Stop after `limit` examples
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// The classifier being evaluated
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Consume the evaluator, returning the trained classifier
    pub fn into_classifier(self) -> C {
        self.classifier
    }

    /// Predict, score and learn a single example
    ///
    /// Returns the outcome and whether the classifier updated.
    pub fn step(&mut self, example: &Example) -> Result<(Outcome, bool)> {
        let x = example.to_features()?;
        // Vectors share the widest length seen so far to limit resizing
        self.feature_dim = self.feature_dim.max(example.max_feature());
        let x = x.with_dim(self.feature_dim);

        let ranking = self.classifier.predict_rank(&x);
        let outcome = Outcome::from_ranking(example.label, &ranking);
        debug_assert!(outcome.r5 || !outcome.r1);
        debug!(
            "True class: {};\tPred. class: {}",
            outcome.label, outcome.predicted
        );

        let updated = self.classifier.learn(&x, example.label)?;
        Ok((outcome, updated))
    }

    /// Process examples in order, sending every outcome to `sink`
    pub fn run<I, S>(&mut self, examples: I, mut sink: S) -> Result<EvaluationSummary>
    where
        I: IntoIterator<Item = Result<Example>>,
        S: OutcomeSink,
    {
        let mut summary = EvaluationSummary::default();
        let limit = self.limit.unwrap_or(usize::MAX);

        for example in examples.into_iter().take(limit) {
            let (outcome, updated) = self.step(&example?)?;
            summary.add(&outcome, updated);
            sink.record(&outcome)?;
        }

        Ok(summary)
    }
}

/// Accumulated R1/R5 hits of an evaluation run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationSummary {
    pub examples: usize,
    pub r1_hits: usize,
    pub r5_hits: usize,
    pub updates: usize,
}

impl EvaluationSummary {
    /// Account for one processed example
    pub fn add(&mut self, outcome: &Outcome, updated: bool) {
        self.examples += 1;
        self.r1_hits += usize::from(outcome.r1);
        self.r5_hits += usize::from(outcome.r5);
        self.updates += usize::from(updated);
    }

    /// Combine with the summary of another run
    pub fn merge(&mut self, other: &EvaluationSummary) {
        self.examples += other.examples;
        self.r1_hits += other.r1_hits;
        self.r5_hits += other.r5_hits;
        self.updates += other.updates;
    }

    /// Mean R1 over processed examples (0 for an empty run)
    pub fn mean_r1(&self) -> f64 {
        Self::ratio(self.r1_hits, self.examples)
    }

    /// Mean R5 over processed examples (0 for an empty run)
    pub fn mean_r5(&self) -> f64 {
        Self::ratio(self.r5_hits, self.examples)
    }

    fn ratio(hits: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn examples(data: Vec<(usize, Vec<usize>)>) -> Vec<Result<Example>> {
        data.into_iter()
            .map(|(label, fs)| Ok(Example::new(label, fs)))
            .collect()
    }

    #[test]
    fn test_small_stream_summary() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        let mut outcomes: Vec<Outcome> = Vec::new();
        let summary = evaluator
            .run(
                examples(vec![(1, vec![1]), (2, vec![2]), (1, vec![1, 2])]),
                &mut outcomes,
            )
            .unwrap();

        assert_eq!(summary.examples, 3);
        assert_eq!(summary.updates, 3);
        assert_relative_eq!(summary.mean_r1(), 1.0 / 3.0);
        assert_relative_eq!(summary.mean_r5(), 1.0 / 3.0);

        assert_eq!(outcomes[0].predicted, 0);
        assert_eq!(outcomes[1].predicted, 0);
        // Classes 1 and 2 tie on the last example, the lower label wins
        assert_eq!(outcomes[2].predicted, 1);
        assert!(outcomes[2].r1);
    }

    #[test]
    fn test_prediction_precedes_learning() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        let (first, updated) = evaluator.step(&Example::new(3, vec![1])).unwrap();
        assert_eq!(first.predicted, 0);
        assert!(updated);

        let (second, _) = evaluator.step(&Example::new(3, vec![1])).unwrap();
        assert_eq!(second.predicted, 3);
        assert!(second.r1);
    }

    #[test]
    fn test_r5_never_below_r1() {
        let stream: Vec<(usize, Vec<usize>)> = (0..200)
            .map(|i| ((i * 7) % 9 + 1, vec![i % 13 + 1, (i * 3) % 17 + 1]))
            .collect();
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        let mut outcomes: Vec<Outcome> = Vec::new();
        let summary = evaluator
            .run(
                stream
                    .iter()
                    .map(|(label, fs)| Ok(Example::new(*label, fs.clone()))),
                &mut outcomes,
            )
            .unwrap();

        assert!(outcomes.iter().all(|o| o.r5 || !o.r1));
        assert!(summary.mean_r5() >= summary.mean_r1());
    }

    #[test]
    fn test_limit_stops_early() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default())
            .unwrap()
            .with_limit(Some(2));
        let summary = evaluator
            .run(examples(vec![(1, vec![1]), (2, vec![2]), (1, vec![1, 2])]), ())
            .unwrap();
        assert_eq!(summary.examples, 2);
    }

    #[test]
    fn test_invalid_example_aborts() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        let result = evaluator.run(examples(vec![(1, vec![1]), (0, vec![2])]), ());
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_dim_tracks_stream_maximum() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        evaluator.step(&Example::new(1, vec![6])).unwrap();
        evaluator.step(&Example::new(2, vec![2])).unwrap();
        let weights = evaluator.classifier().weights().unwrap();
        assert_eq!(weights.shape(), (6, 2));
    }

    #[test]
    fn test_presized_classifier_seeds_dimension() {
        let config = EmaConfig {
            initial_shape: Some((8, 2)),
            ..EmaConfig::default()
        };
        let evaluator = OnlineEvaluator::new(config).unwrap();
        assert_eq!(evaluator.feature_dim, 8);
    }

    #[test]
    fn test_empty_run() {
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        let summary = evaluator.run(Vec::new(), ()).unwrap();
        assert_eq!(summary.examples, 0);
        assert_eq!(summary.mean_r1(), 0.0);
        assert_eq!(summary.mean_r5(), 0.0);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = EvaluationSummary {
            examples: 2,
            r1_hits: 1,
            r5_hits: 2,
            updates: 2,
        };
        let b = EvaluationSummary {
            examples: 2,
            r1_hits: 0,
            r5_hits: 1,
            updates: 1,
        };
        a.merge(&b);
        assert_eq!(a.examples, 4);
        assert_relative_eq!(a.mean_r1(), 0.25);
        assert_relative_eq!(a.mean_r5(), 0.75);
    }
}
