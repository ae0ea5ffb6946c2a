//! What the binaries run, kept in the library so it can be tested.

use std::sync::Arc;

use anyhow::{Context, Result};
use array_transcoder::{ArrayProvider, FilesystemArrayProvider, HttpArrayProvider, TranscodeReport, Transcoder};
use schema_catalog::{Catalog, CatalogBuilder, DescribeDocumentProvider, DocumentSource};
use tracing::info;

use crate::config_loader::{CatalogConfig, SourceConfig, TranscodeConfig};

fn describe_builder(location: &str) -> CatalogBuilder {
    let provider = DescribeDocumentProvider::new(DocumentSource::parse(location));
    CatalogBuilder::new(Arc::new(provider))
}

/// Build the catalog for every configured target and write it.
pub async fn build_catalog(config: &CatalogConfig) -> Result<Catalog> {
    info!(
        source = %config.describe_source,
        targets = config.targets.len(),
        "Building catalog"
    );

    let catalog = describe_builder(&config.describe_source)
        .build_catalog(&config.targets)
        .await;

    catalog
        .write_to(&config.output)
        .with_context(|| format!("Failed to write catalog to {:?}", config.output))?;

    info!(
        output = %config.output.display(),
        datasets = catalog.datasets.len(),
        generated = %catalog.generated.to_rfc3339(),
        "Catalog written"
    );
    Ok(catalog)
}

/// Turn a source configuration into an array provider.
///
/// A describe document is resolved to the store URL of the configured
/// service, with the same selection rules the catalog uses.
pub async fn array_provider(source: &SourceConfig, dataset_id: &str) -> Result<Arc<dyn ArrayProvider>> {
    if let Some(path) = &source.local_path {
        return Ok(Arc::new(FilesystemArrayProvider::new(path)));
    }

    if let Some(url) = &source.store_url {
        return Ok(Arc::new(HttpArrayProvider::new(url.clone())));
    }

    let location = source
        .describe_source
        .as_deref()
        .context("No transcode source configured")?;

    let resolved = describe_builder(location)
        .resolve_service(dataset_id, source.service_name())
        .await
        .with_context(|| format!("Failed to describe {}", dataset_id))?
        .with_context(|| {
            format!(
                "No zarr service {:?} found for {}",
                source.service_name(),
                dataset_id
            )
        })?;

    info!(
        dataset_id = %dataset_id,
        service = %resolved.service.service_name,
        url = %resolved.service.uri,
        "Resolved store URL"
    );
    Ok(Arc::new(HttpArrayProvider::new(resolved.service.uri)))
}

/// Run one transcode.
pub async fn transcode(config: &TranscodeConfig) -> Result<TranscodeReport> {
    let provider = array_provider(&config.source, &config.transcode.dataset_id).await?;
    let report = Transcoder::new(provider)
        .run(&config.transcode)
        .await
        .with_context(|| format!("Transcode of {} failed", config.transcode.dataset_id))?;
    Ok(report)
}
