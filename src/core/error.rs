//! Error types for the EMA classifier

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmaError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid class label: expected a positive integer, got {0}")]
    InvalidLabel(usize),

    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, EmaError>;
