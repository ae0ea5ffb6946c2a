//! Local Zarr v2 directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use zarrs_filesystem::FilesystemStore;

use super::{ArrayProvider, OpenRequest, ZarrGroupReader};
use crate::error::{Result, TranscodeError};
use crate::stages::OpenedDataset;

/// Provider backed by a consolidated Zarr group on local disk.
///
/// The dataset id in the request is only used for logging; the root
/// directory is the dataset.
#[derive(Debug, Clone)]
pub struct FilesystemArrayProvider {
    root: PathBuf,
}

impl FilesystemArrayProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArrayProvider for FilesystemArrayProvider {
    async fn open_dataset(&self, request: &OpenRequest) -> Result<OpenedDataset> {
        if !self.root.is_dir() {
            return Err(TranscodeError::provider(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        info!(
            dataset_id = %request.dataset_id,
            path = %self.root.display(),
            "Opening local Zarr store"
        );
        let store = FilesystemStore::new(&self.root)
            .map_err(|e| TranscodeError::provider(e.to_string()))?;
        ZarrGroupReader::open(Arc::new(store))?.read_dataset(request)
    }
}
