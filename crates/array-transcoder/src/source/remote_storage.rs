//! Remote ARCO stores over plain HTTP.
//!
//! Consolidated stores can be read with nothing more than GET requests, so
//! an `object_store` HTTP client is wrapped for the synchronous `zarrs` API.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::http::{HttpBuilder, HttpStore};
use object_store::ClientOptions;
use tracing::info;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{AsyncToSyncBlockOn, AsyncToSyncStorageAdapter};

use super::{ArrayProvider, OpenRequest, ZarrGroupReader};
use crate::error::{Result, TranscodeError};
use crate::stages::OpenedDataset;

/// Drives remote reads from the synchronous `zarrs` API. Needs the
/// multi-threaded runtime.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Synchronous storage over an HTTP object store.
pub type HttpStorage = AsyncToSyncStorageAdapter<AsyncObjectStore<HttpStore>, TokioBlockOn>;

/// Create a read-only storage backend rooted at `url`.
pub fn create_http_storage(url: &str) -> Result<Arc<HttpStorage>> {
    let options = ClientOptions::new().with_allow_http(url.starts_with("http://"));
    let http = HttpBuilder::new()
        .with_url(url.trim_end_matches('/'))
        .with_client_options(options)
        .build()
        .map_err(|e| TranscodeError::provider(format!("Failed to create HTTP client for {}: {}", url, e)))?;

    let async_store = Arc::new(AsyncObjectStore::new(http));
    Ok(Arc::new(AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn)))
}

/// Provider reading a remote consolidated Zarr group.
#[derive(Debug, Clone)]
pub struct HttpArrayProvider {
    url: String,
}

impl HttpArrayProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ArrayProvider for HttpArrayProvider {
    async fn open_dataset(&self, request: &OpenRequest) -> Result<OpenedDataset> {
        info!(dataset_id = %request.dataset_id, url = %self.url, "Opening remote Zarr store");
        let storage = create_http_storage(&self.url)?;
        ZarrGroupReader::open(storage)?.read_dataset(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DepthRange;
    use test_utils::{serve_directory, CurrentsFixture};

    fn request(variables: &[&str]) -> OpenRequest {
        OpenRequest {
            dataset_id: "fixture".to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            depth_range: DepthRange { min: 0.0, max: 0.5 },
        }
    }

    #[test]
    fn test_create_storage_accepts_https_url() {
        let url = "https://s3.waw3-1.cloudferro.com/mdl-arco-time-045/arco/PRODUCT/dataset/timeChunked.zarr/";
        assert!(create_http_storage(url).is_ok());
    }

    #[test]
    fn test_provider_keeps_url() {
        let provider = HttpArrayProvider::new("https://example.org/store.zarr");
        assert_eq!(provider.url(), "https://example.org/store.zarr");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_store_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = CurrentsFixture::new([2, 3, 6, 8]).with_chunks([1, 1, 4, 4]);
        fixture.write(dir.path()).unwrap();
        let server = serve_directory(dir.path()).await;

        let storage = create_http_storage(server.base_url()).unwrap();
        let group = ZarrGroupReader::open(storage).unwrap();
        assert!(group.metadata().array("uo").is_some());

        let opened = HttpArrayProvider::new(server.base_url())
            .open_dataset(&request(&["uo", "vo"]))
            .await
            .unwrap();
        let sizes = opened.dataset().sizes();
        assert_eq!(sizes["time"], 2);
        assert_eq!(sizes["depth"], 1);
        assert_eq!(sizes["latitude"], 6);
        assert_eq!(sizes["longitude"], 8);

        let uo = opened.dataset().variables()[0].materialize().unwrap();
        let expected: Vec<f64> = (0..6)
            .flat_map(|y| (0..8).map(move |x| (y, x)))
            .map(|(y, x)| fixture.uo[fixture.index(0, 0, y, x)] as f64)
            .collect();
        assert_eq!(uo.shape, vec![2, 1, 6, 8]);
        assert_eq!(&uo.values[..48], &expected[..]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unconsolidated_remote_store_is_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = serve_directory(dir.path()).await;

        let err = HttpArrayProvider::new(server.base_url())
            .open_dataset(&request(&["uo"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Provider(_)));
    }
}
