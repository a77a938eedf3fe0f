//! The EMA online multiclass classifier
//!
//! EMA keeps a sparse weight matrix from features to classes and updates it
//! one example at a time, only when the true class does not win by a margin.
//! An update decays the weights of the active features, boosts the true class
//! with the raw feature intensities and drops weights that became negligible.
//! Decay keyed to feature activity makes the model forget stale associations,
//! which suits non-stationary streams.
//!
//! The algorithm is described in Madani, Bui and Yeh, "Prediction and
//! Discovery of Users' Desktop Behavior", AAAI 2009.
//!
//! ```rust
//! use ema::{Ema, EmaConfig, FeatureVector};
//!
//! # fn main() -> ema::core::Result<()> {
//! let mut ema = Ema::new(EmaConfig::default())?;
//! let x = FeatureVector::from_indices(&[0, 3]);
//!
//! assert_eq!(ema.predict(&x), 0);
//! assert!(ema.learn(&x, 2)?);
//! assert_eq!(ema.predict(&x), 2);
//! # Ok(())
//! # }
//! ```

use crate::core::{EmaConfig, EmaError, FeatureVector, OnlineClassifier, Result};
use crate::weights::SparseWeightStore;
use log::trace;

/// EMA classifier engine
#[derive(Debug, Clone)]
pub struct Ema {
    config: EmaConfig,
    weights: Option<SparseWeightStore>,
}

impl Ema {
    /// Create a classifier with the given hyperparameters
    ///
    /// With `initial_shape` set the classifier starts with an all-zero weight
    /// matrix of that shape; otherwise it starts with no weights at all.
    pub fn new(config: EmaConfig) -> Result<Self> {
        config.validate()?;
        let weights = config
            .initial_shape
            .map(|(rows, cols)| SparseWeightStore::new(rows, cols));
        Ok(Self { config, weights })
    }

    /// Create a classifier starting from an existing weight matrix
    ///
    /// The matrix supersedes `initial_shape`.
    pub fn with_weights(config: EmaConfig, weights: SparseWeightStore) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            weights: Some(weights),
        })
    }

    /// Hyperparameters in use
    pub fn config(&self) -> &EmaConfig {
        &self.config
    }

    /// Current weight matrix, `None` before the first update
    pub fn weights(&self) -> Option<&SparseWeightStore> {
        self.weights.as_ref()
    }

    /// Whether a weight matrix exists
    pub fn is_initialized(&self) -> bool {
        self.weights.is_some()
    }

    /// Classes ranked by descending score, best first
    ///
    /// Features beyond the rows of the weight matrix are ignored. Ties are
    /// broken by ascending class label. Only classes with a stored weight in
    /// some active feature row are ranked.
    pub fn predict_rank(&self, x: &FeatureVector) -> Vec<usize> {
        let Some(weights) = &self.weights else {
            return Vec::new();
        };

        let scores = if x.dim() > weights.n_rows() {
            weights.score(&x.cropped(weights.n_rows()))
        } else {
            weights.score(x)
        };

        // Scores come out in class order, so a stable sort keeps ties ascending
        let mut ranked: Vec<(usize, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().map(|(class, _)| class + 1).collect()
    }

    /// Most likely class, 0 when there is no prediction
    pub fn predict(&self, x: &FeatureVector) -> usize {
        self.predict_rank(x).first().copied().unwrap_or(0)
    }

    /// Run one learning iteration on `x` with true class `label` (1-based)
    ///
    /// Returns whether the weights were updated. The very first observation
    /// always updates.
    pub fn learn(&mut self, x: &FeatureVector, label: usize) -> Result<bool> {
        if label == 0 {
            return Err(EmaError::InvalidLabel(label));
        }
        x.validate()?;

        let first_time = self.weights.is_none();
        let config = &self.config;
        let weights = self
            .weights
            .get_or_insert_with(|| SparseWeightStore::new(1, 1));
        weights.resize(x.dim(), label);

        let class = label - 1;
        let mut margin = 0.0;
        if !first_time {
            let scores = weights.score(x);
            let sy = scores.get(&class).copied().unwrap_or(0.0);
            let scp = scores.values().sum::<f64>() - sy;
            margin = sy - scp;
            trace!("Class {label}: sy={sy}, scp={scp}, margin={margin}");
        }

        if !first_time && margin >= config.margin {
            return Ok(false);
        }

        // Decay active features
        let factors: Vec<f64> = x
            .values()
            .iter()
            .map(|&xi| 1.0 - config.boost * xi * xi)
            .collect();
        weights.scale_rows(x.indices(), &factors);

        // Boost true class
        weights.add_outer_column(x, class)?;

        // Drop small weights
        weights.prune_below(config.prune_threshold);

        Ok(true)
    }
}

impl OnlineClassifier for Ema {
    fn predict_rank(&self, x: &FeatureVector) -> Vec<usize> {
        Ema::predict_rank(self, x)
    }

    fn learn(&mut self, x: &FeatureVector, label: usize) -> Result<bool> {
        Ema::learn(self, x, label)
    }

    fn feature_dim(&self) -> usize {
        self.weights.as_ref().map_or(0, SparseWeightStore::n_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x(indices: &[usize]) -> FeatureVector {
        FeatureVector::from_indices(indices)
    }

    #[test]
    fn test_no_prediction_before_learning() {
        let ema = Ema::new(EmaConfig::default()).unwrap();
        assert!(!ema.is_initialized());
        assert!(ema.predict_rank(&x(&[0, 1])).is_empty());
        assert_eq!(ema.predict(&x(&[0, 1])), 0);
    }

    #[test]
    fn test_first_learn_boosts_raw_value() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        let updated = ema.learn(&x(&[0]), 1).unwrap();

        assert!(updated);
        let weights = ema.weights().unwrap();
        assert_eq!(weights.shape(), (1, 1));
        assert_eq!(weights.get(0, 0), 1.0);
    }

    #[test]
    fn test_first_learn_updates_regardless_of_margin() {
        let config = EmaConfig {
            margin: -5.0,
            ..EmaConfig::default()
        };
        let mut ema = Ema::new(config).unwrap();
        assert!(ema.learn(&x(&[2]), 3).unwrap());
        assert_eq!(ema.weights().unwrap().get(2, 2), 1.0);
        // Afterwards the margin rule applies
        assert!(!ema.learn(&x(&[5]), 1).unwrap());
    }

    #[test]
    fn test_learn_rejects_zero_label() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        assert!(matches!(
            ema.learn(&x(&[0]), 0),
            Err(EmaError::InvalidLabel(0))
        ));
        assert!(!ema.is_initialized());
    }

    #[test]
    fn test_learn_rejects_invalid_intensity() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        ema.learn(&x(&[0]), 1).unwrap();
        let before = ema.weights().unwrap().clone();

        let bad = FeatureVector::new(vec![0], vec![f64::INFINITY]);
        assert!(ema.learn(&bad, 1).is_err());
        assert_eq!(ema.weights().unwrap(), &before);
    }

    #[test]
    fn test_margin_suppression_leaves_weights_unchanged() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        ema.learn(&x(&[0]), 1).unwrap();
        let before = ema.weights().unwrap().clone();

        // sy = 1.0, scp = 0.0, margin 1.0 >= 0.15
        let updated = ema.learn(&x(&[0]), 1).unwrap();
        assert!(!updated);
        assert_eq!(ema.weights().unwrap(), &before);
    }

    #[test]
    fn test_update_decays_then_boosts() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        ema.learn(&x(&[0]), 1).unwrap();

        // Class 2 has no score, margin = 0 - 1 < d
        assert!(ema.learn(&x(&[0]), 2).unwrap());
        let weights = ema.weights().unwrap();
        assert_eq!(weights.shape(), (1, 2));
        assert_relative_eq!(weights.get(0, 0), 0.85);
        assert_relative_eq!(weights.get(0, 1), 1.0);
    }

    #[test]
    fn test_decay_uses_squared_intensity() {
        let config = EmaConfig {
            boost: 0.2,
            ..EmaConfig::default()
        };
        let mut ema = Ema::new(config).unwrap();
        let x2 = FeatureVector::new(vec![0], vec![2.0]);
        ema.learn(&x2, 1).unwrap();
        assert_eq!(ema.weights().unwrap().get(0, 0), 2.0);

        ema.learn(&x2, 2).unwrap();
        // 2.0 * (1 - 0.2 * 4) = 0.4
        assert_relative_eq!(ema.weights().unwrap().get(0, 0), 0.4, epsilon = 1e-12);
        assert_relative_eq!(ema.weights().unwrap().get(0, 1), 2.0);
    }

    #[test]
    fn test_update_prunes_small_weights() {
        let config = EmaConfig {
            boost: 1.0,
            ..EmaConfig::default()
        };
        let mut ema = Ema::new(config).unwrap();
        ema.learn(&x(&[0]), 1).unwrap();

        // Factor 1 - 1.0 * 1 = 0 wipes the old weight, which is then pruned
        ema.learn(&x(&[0]), 2).unwrap();
        let weights = ema.weights().unwrap();
        assert_eq!(weights.nnz(), 1);
        assert_eq!(weights.get(0, 1), 1.0);
    }

    #[test]
    fn test_monotonic_growth() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        ema.learn(&x(&[4]), 2).unwrap();
        assert_eq!(ema.weights().unwrap().shape(), (5, 2));

        ema.learn(&x(&[1]), 1).unwrap();
        assert_eq!(ema.weights().unwrap().shape(), (5, 2));

        ema.learn(&x(&[1]).with_dim(9), 7).unwrap();
        assert_eq!(ema.weights().unwrap().shape(), (9, 7));
        assert_eq!(ema.feature_dim(), 9);
    }

    #[test]
    fn test_predict_rank_orders_by_score() {
        let mut weights = SparseWeightStore::new(2, 3);
        weights.set(0, 0, 0.2).unwrap();
        weights.set(0, 1, 0.9).unwrap();
        weights.set(1, 2, 0.5).unwrap();
        let ema = Ema::with_weights(EmaConfig::default(), weights).unwrap();

        assert_eq!(ema.predict_rank(&x(&[0, 1])), vec![2, 3, 1]);
        assert_eq!(ema.predict(&x(&[0, 1])), 2);
        assert_eq!(ema.predict_rank(&x(&[1])), vec![3]);
    }

    #[test]
    fn test_predict_rank_ties_break_by_label() {
        let mut weights = SparseWeightStore::new(2, 3);
        weights.set(0, 2, 1.0).unwrap();
        weights.set(1, 0, 1.0).unwrap();
        let ema = Ema::with_weights(EmaConfig::default(), weights).unwrap();

        assert_eq!(ema.predict_rank(&x(&[0, 1])), vec![1, 3]);
    }

    #[test]
    fn test_predict_crops_long_vectors() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        ema.learn(&x(&[0]), 1).unwrap();

        let long = x(&[0, 7]).with_dim(20);
        assert_eq!(ema.predict_rank(&long), vec![1]);
        // Prediction never resizes
        assert_eq!(ema.weights().unwrap().shape(), (1, 1));
    }

    #[test]
    fn test_initial_shape_starts_active() {
        let config = EmaConfig {
            initial_shape: Some((10, 3)),
            ..EmaConfig::default()
        };
        let mut ema = Ema::new(config).unwrap();
        assert!(ema.is_initialized());
        assert!(ema.predict_rank(&x(&[0])).is_empty());

        // Zero scores give a zero margin, below the default threshold
        assert!(ema.learn(&x(&[0]), 2).unwrap());
        assert_eq!(ema.weights().unwrap().shape(), (10, 3));
        assert_eq!(ema.weights().unwrap().get(0, 1), 1.0);
    }

    #[test]
    fn test_empty_feature_vector_is_legal() {
        let mut ema = Ema::new(EmaConfig::default()).unwrap();
        assert!(ema.learn(&FeatureVector::empty(), 2).unwrap());
        assert_eq!(ema.weights().unwrap().shape(), (1, 2));
        assert_eq!(ema.weights().unwrap().nnz(), 0);
        assert!(ema.predict_rank(&FeatureVector::empty()).is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EmaConfig {
            boost: 0.0,
            ..EmaConfig::default()
        };
        assert!(matches!(
            Ema::new(config),
            Err(EmaError::InvalidParameter(_))
        ));
    }
}
