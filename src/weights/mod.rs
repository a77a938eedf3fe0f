//! Growable sparse weight matrix
//!
//! Weights are indexed by (feature, class). Each feature row keeps an ordered
//! map from class index to weight, so growing the matrix never moves existing
//! entries and row-scoped operations only touch what is stored.

use crate::core::{EmaError, FeatureVector, Result};
use log::debug;
use std::collections::BTreeMap;

/// Sparse class scores, keyed by 0-based class index
pub type Scores = BTreeMap<usize, f64>;

/// Sparse (features x classes) weight matrix that only ever grows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseWeightStore {
    rows: Vec<BTreeMap<usize, f64>>,
    n_cols: usize,
}

impl SparseWeightStore {
    /// Create an all-zero store of the given shape
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            rows: vec![BTreeMap::new(); n_rows],
            n_cols,
        }
    }

    /// Shape as (features, classes)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.n_cols)
    }

    /// Number of feature rows
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of class columns
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// Weight at (row, col), 0 if not stored or out of range
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(&col))
            .copied()
            .unwrap_or(0.0)
    }

    /// Stored entries of one feature row, if the row exists
    pub fn row(&self, row: usize) -> Option<&BTreeMap<usize, f64>> {
        self.rows.get(row)
    }

    /// Store a weight at (row, col), which must lie inside the current shape
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.check_bounds(row, col)?;
        self.rows[row].insert(col, value);
        Ok(())
    }

    /// Iterate over stored `(row, col, value)` entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |(&j, &v)| (i, j, v)))
    }

    /// Grow to at least (min_rows, min_cols); never shrinks
    pub fn resize(&mut self, min_rows: usize, min_cols: usize) {
        let n_rows = self.rows.len().max(min_rows);
        let n_cols = self.n_cols.max(min_cols);
        if (n_rows, n_cols) != self.shape() {
            debug!("Resizing W to {:?}", (n_rows, n_cols));
            self.rows.resize_with(n_rows, BTreeMap::new);
            self.n_cols = n_cols;
        }
    }

    /// Compute `x * W`, keeping only classes stored in some active row
    ///
    /// Feature indices outside the row range contribute nothing.
    pub fn score(&self, x: &FeatureVector) -> Scores {
        let mut scores = Scores::new();
        for (i, xi) in x.iter() {
            if let Some(row) = self.rows.get(i) {
                for (&j, &w) in row {
                    *scores.entry(j).or_insert(0.0) += xi * w;
                }
            }
        }
        scores
    }

    /// Multiply every stored weight of row `indices[k]` by `factors[k]`
    pub fn scale_rows(&mut self, indices: &[usize], factors: &[f64]) {
        debug_assert_eq!(indices.len(), factors.len());
        for (&i, &factor) in indices.iter().zip(factors) {
            if let Some(row) = self.rows.get_mut(i) {
                row.values_mut().for_each(|w| *w *= factor);
            }
        }
    }

    /// Add the values of `x` into column `col`: `W[i, col] += x[i]`
    pub fn add_outer_column(&mut self, x: &FeatureVector, col: usize) -> Result<()> {
        if col >= self.n_cols {
            return Err(EmaError::DimensionMismatch {
                expected: self.n_cols,
                actual: col + 1,
            });
        }
        if let Some(&last) = x.indices().last() {
            if last >= self.rows.len() {
                return Err(EmaError::DimensionMismatch {
                    expected: self.rows.len(),
                    actual: last + 1,
                });
            }
        }
        for (i, xi) in x.iter() {
            *self.rows[i].entry(col).or_insert(0.0) += xi;
        }
        Ok(())
    }

    /// Drop every entry whose absolute value is below `threshold`
    ///
    /// Returns the number of removed entries.
    pub fn prune_below(&mut self, threshold: f64) -> usize {
        let before = self.nnz();
        for row in &mut self.rows {
            row.retain(|_, w| w.abs() >= threshold);
        }
        let removed = before - self.nnz();
        if removed > 0 {
            debug!("Removed {} small weights (nnz: {})", removed, before - removed);
        }
        removed
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows.len() {
            return Err(EmaError::DimensionMismatch {
                expected: self.rows.len(),
                actual: row + 1,
            });
        }
        if col >= self.n_cols {
            return Err(EmaError::DimensionMismatch {
                expected: self.n_cols,
                actual: col + 1,
            });
        }
        Ok(())
    }
}
