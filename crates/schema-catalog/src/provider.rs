//! Remote metadata providers.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::describe::DescribeResponse;
use crate::error::{CatalogError, Result};

/// Source of dataset metadata.
///
/// Implementations only read; no mutating calls are issued. A dataset the
/// provider does not know is reported as a response with no products, not
/// as an error.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Describe the hierarchy for one dataset identifier.
    async fn describe(&self, dataset_id: &str) -> Result<DescribeResponse>;
}

/// Where a describe document is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
}

impl DocumentSource {
    /// Parse a location string: `http(s)://` URLs are fetched, anything
    /// else is a local path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Metadata provider backed by a full describe document.
///
/// The document (the JSON output of `copernicusmarine describe`) is loaded
/// once, on first query, and answers every subsequent query.
pub struct DescribeDocumentProvider {
    source: DocumentSource,
    client: reqwest::Client,
    document: OnceCell<Arc<DescribeResponse>>,
}

impl DescribeDocumentProvider {
    pub fn new(source: DocumentSource) -> Self {
        Self {
            source,
            client: reqwest::Client::new(),
            document: OnceCell::new(),
        }
    }

    /// Provider over an already loaded document.
    pub fn from_document(document: DescribeResponse) -> Self {
        Self {
            source: DocumentSource::Url("memory://".to_string()),
            client: reqwest::Client::new(),
            document: OnceCell::new_with(Some(Arc::new(document))),
        }
    }

    async fn document(&self) -> Result<Arc<DescribeResponse>> {
        self.document
            .get_or_try_init(|| async {
                let response = self.load().await?;
                info!(
                    source = %self.source,
                    products = response.products.len(),
                    "Loaded describe document"
                );
                Ok(Arc::new(response))
            })
            .await
            .cloned()
    }

    async fn load(&self) -> Result<DescribeResponse> {
        let body = match &self.source {
            DocumentSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                CatalogError::provider(format!("failed to read {}: {}", path.display(), e))
            })?,
            DocumentSource::Url(url) => self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| CatalogError::provider(format!("GET {} failed: {}", url, e)))?
                .text()
                .await
                .map_err(|e| CatalogError::provider(format!("reading {} failed: {}", url, e)))?,
        };

        serde_json::from_str(&body)
            .map_err(|e| CatalogError::provider(format!("malformed describe document: {}", e)))
    }
}

#[async_trait]
impl MetadataProvider for DescribeDocumentProvider {
    async fn describe(&self, dataset_id: &str) -> Result<DescribeResponse> {
        let document = self.document().await?;
        let response = document.filter_dataset(dataset_id);
        debug!(
            dataset_id = %dataset_id,
            products = response.products.len(),
            "Described dataset"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_source_parse() {
        assert_eq!(
            DocumentSource::parse("https://example.org/describe.json"),
            DocumentSource::Url("https://example.org/describe.json".to_string())
        );
        assert_eq!(
            DocumentSource::parse("data/describe.json"),
            DocumentSource::File(PathBuf::from("data/describe.json"))
        );
    }

    #[test]
    fn test_missing_file_is_provider_fault() {
        let provider = DescribeDocumentProvider::new(DocumentSource::File(PathBuf::from(
            "/nonexistent/describe.json",
        )));
        let err = tokio_test::block_on(provider.describe("any")).unwrap_err();
        assert!(matches!(err, CatalogError::Provider(_)));
    }

    #[tokio::test]
    async fn test_file_document_is_loaded_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("describe.json");
        std::fs::write(
            &path,
            r#"{"products":[{"product_id":"P","datasets":[{"dataset_id":"d1"},{"dataset_id":"d2"}]}]}"#,
        )
        .unwrap();

        let provider = DescribeDocumentProvider::new(DocumentSource::File(path));
        let response = provider.describe("d2").await.unwrap();
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.products[0].datasets[0].dataset_id, "d2");

        let empty = provider.describe("d3").await.unwrap();
        assert!(empty.products.is_empty());
    }
}
