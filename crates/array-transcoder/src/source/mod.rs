//! Array providers: where source datasets come from.
//!
//! A provider turns an [`OpenRequest`] into an [`OpenedDataset`]: the four
//! coordinate axes read into memory, the requested variables as lazy
//! arrays, and the depth band already applied. Both built-in providers read
//! consolidated Zarr v2 groups through [`ZarrGroupReader`]; they differ only
//! in the storage backend.

mod filesystem;
mod remote_storage;
mod zarr_reader;

pub use filesystem::FilesystemArrayProvider;
pub use remote_storage::{create_http_storage, HttpArrayProvider, HttpStorage, TokioBlockOn};
pub use zarr_reader::{ZarrArraySource, ZarrGroupReader};

use async_trait::async_trait;

use crate::config::{DepthRange, TranscodeSpec};
use crate::error::Result;
use crate::stages::OpenedDataset;

/// What to open from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub dataset_id: String,
    pub variables: Vec<String>,
    pub depth_range: DepthRange,
}

impl From<&TranscodeSpec> for OpenRequest {
    fn from(spec: &TranscodeSpec) -> Self {
        Self {
            dataset_id: spec.dataset_id.clone(),
            variables: spec.variables.clone(),
            depth_range: spec.depth_range,
        }
    }
}

/// Source of gridded datasets.
#[async_trait]
pub trait ArrayProvider: Send + Sync {
    /// Open the requested variables of a dataset.
    ///
    /// Fails with `MissingAxis`, `MissingVariable` or `EmptySelection` when
    /// the dataset cannot satisfy the request, and with `Provider` when the
    /// dataset cannot be reached at all.
    async fn open_dataset(&self, request: &OpenRequest) -> Result<OpenedDataset>;
}
