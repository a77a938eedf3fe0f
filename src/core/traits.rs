//! Core traits for online classification

use crate::core::{FeatureVector, Outcome, Result};

/// Online multiclass classifier that learns one example at a time
pub trait OnlineClassifier: Send {
    /// Rank 1-based class labels from most to least likely
    ///
    /// Returns an empty ranking when nothing has been learned yet.
    fn predict_rank(&self, x: &FeatureVector) -> Vec<usize>;

    /// Predict the most likely class, or 0 when there is no prediction
    fn predict(&self, x: &FeatureVector) -> usize {
        self.predict_rank(x).first().copied().unwrap_or(0)
    }

    /// Learn from a single example, returning whether the model was updated
    fn learn(&mut self, x: &FeatureVector, label: usize) -> Result<bool>;

    /// Number of feature rows currently allocated (0 before any learning)
    fn feature_dim(&self) -> usize;
}

/// Destination for per-example outcomes of an evaluation run
pub trait OutcomeSink {
    /// Record one outcome
    fn record(&mut self, outcome: &Outcome) -> Result<()>;
}

/// Discards every outcome
impl OutcomeSink for () {
    fn record(&mut self, _outcome: &Outcome) -> Result<()> {
        Ok(())
    }
}

/// Collects outcomes in memory
impl OutcomeSink for Vec<Outcome> {
    fn record(&mut self, outcome: &Outcome) -> Result<()> {
        self.push(*outcome);
        Ok(())
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for &mut S {
    fn record(&mut self, outcome: &Outcome) -> Result<()> {
        (**self).record(outcome)
    }
}

/// Optional sink, `None` discards
impl<S: OutcomeSink> OutcomeSink for Option<S> {
    fn record(&mut self, outcome: &Outcome) -> Result<()> {
        match self {
            Some(sink) => sink.record(outcome),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinks() {
        let outcome = Outcome::from_ranking(2, &[1, 2]);

        let mut collected: Vec<Outcome> = Vec::new();
        (&mut collected).record(&outcome).unwrap();
        Some(&mut collected).record(&outcome).unwrap();
        None::<Vec<Outcome>>.record(&outcome).unwrap();
        ().record(&outcome).unwrap();

        assert_eq!(collected.len(), 2);
        assert!(!collected[0].r1);
        assert!(collected[0].r5);
    }
}
