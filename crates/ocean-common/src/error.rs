//! Error types for schema descriptors.

use thiserror::Error;

/// Result type alias using SchemaError.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while interpreting axis and dimension metadata.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("unknown axis role: {0}")]
    UnknownAxis(String),

    #[error("invalid dimension '{dimension}': {message}")]
    InvalidDimension { dimension: String, message: String },
}

impl SchemaError {
    /// Create an InvalidDimension error.
    pub fn invalid_dimension(dimension: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDimension {
            dimension: dimension.into(),
            message: message.into(),
        }
    }
}
