//! Error types for catalog building.

use thiserror::Error;

/// Errors that can occur while building a catalog entry.
///
/// A dataset or service that simply does not exist is not an error; the
/// builder reports it as `None`.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The metadata provider failed (network, auth, malformed document).
    #[error("metadata provider error: {0}")]
    Provider(String),

    /// Coordinate metadata could not be turned into a dimension descriptor.
    #[error("schema error: {0}")]
    Schema(#[from] ocean_common::SchemaError),

    /// Requested variables do not share one coordinate grid.
    #[error("variable '{variable}' of dataset '{dataset}' does not share the grid of '{reference}'")]
    GridMismatch {
        dataset: String,
        variable: String,
        reference: String,
    },

    /// A target specification is malformed.
    #[error("invalid target configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    /// Create a Provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
