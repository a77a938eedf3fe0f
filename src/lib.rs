//! Rust implementation of the EMA online multiclass classifier
//!
//! A mistake-driven learner over sparse binary features: every update decays
//! the weights of the active features, boosts the true class and prunes small
//! weights. Evaluation is online, each example is predicted before it is
//! learned from.

pub mod api;
pub mod classifier;
pub mod core;
pub mod data;
pub mod evaluation;
pub mod report;
pub mod weights;

// Re-export main types for convenience
pub use crate::api::{OnlineSession, SessionResult};
pub use crate::classifier::Ema;
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{GreenbergFeaturizer, SparseDatasetReader, Vocabulary};
pub use crate::evaluation::{EvaluationSummary, OnlineEvaluator};
pub use crate::report::{format_g, OutcomeWriter, SummaryReport};
pub use crate::weights::SparseWeightStore;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
