//! Example sources
//!
//! This module provides readers that turn raw input into streams of
//! `(class, feature ids)` examples for online evaluation.

pub mod greenberg;
pub mod sparse;

pub use self::greenberg::{GreenbergEncoder, GreenbergFeaturizer, Vocabulary};
pub use self::sparse::SparseDatasetReader;
