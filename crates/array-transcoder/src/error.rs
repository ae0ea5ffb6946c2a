//! Error types for transcoding.

use std::path::PathBuf;

use ocean_common::AxisRole;
use thiserror::Error;

/// Errors that can occur while transcoding a store.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// The transcode specification was rejected before any remote call.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The array provider could not be reached or answered malformed data.
    #[error("provider error: {0}")]
    Provider(String),

    /// The dataset lacks one of the four coordinate axes.
    #[error("dataset has no {axis} coordinate")]
    MissingAxis { axis: AxisRole },

    /// A requested variable is not in the dataset.
    #[error("variable not found: {0}")]
    MissingVariable(String),

    /// A selection or reduction left an axis with no samples.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Zarr format or codec error.
    #[error("Zarr format error: {0}")]
    Zarr(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Another run holds the destination.
    #[error("destination {} is locked by another run", .0.display())]
    DestinationLocked(PathBuf),

    /// The written store does not match what was encoded.
    #[error("verification failed: {0}")]
    Verification(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TranscodeError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn empty_selection(msg: impl Into<String>) -> Self {
        Self::EmptySelection(msg.into())
    }

    pub fn zarr(msg: impl Into<String>) -> Self {
        Self::Zarr(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }
}

/// Result type for transcoding operations.
pub type Result<T> = std::result::Result<T, TranscodeError>;
