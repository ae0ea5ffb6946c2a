//! Catalog builder: one [`CatalogEntry`] per [`TargetSpec`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use ocean_common::VariableDescriptor;

use crate::catalog::{Catalog, CatalogEntry};
use crate::describe::ProviderService;
use crate::error::{CatalogError, Result};
use crate::provider::MetadataProvider;
use crate::selection::SelectionPolicy;
use crate::target::TargetSpec;
use crate::ZARR_FORMAT;

/// A delivery variant resolved through the selection policy.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub product_id: String,
    pub dataset_id: String,
    pub version: Option<String>,
    pub service: ProviderService,
}

/// Builds catalog entries from a metadata provider.
pub struct CatalogBuilder {
    provider: Arc<dyn MetadataProvider>,
    policy: SelectionPolicy,
}

impl CatalogBuilder {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self::with_policy(provider, SelectionPolicy::default())
    }

    pub fn with_policy(provider: Arc<dyn MetadataProvider>, policy: SelectionPolicy) -> Self {
        Self { provider, policy }
    }

    /// Find the named zarr delivery variant of a dataset.
    ///
    /// Returns `Ok(None)` when the dataset, the service, or a zarr-formatted
    /// service does not exist. Provider faults are errors.
    pub async fn resolve_service(
        &self,
        dataset_id: &str,
        service_name: &str,
    ) -> Result<Option<ResolvedService>> {
        let response = self.provider.describe(dataset_id).await?;

        if response.products.is_empty() {
            warn!(dataset_id = %dataset_id, "No products found");
            return Ok(None);
        }

        let Some(selection) = self.policy.select(&response, dataset_id) else {
            warn!(dataset_id = %dataset_id, "Provider hierarchy has no version or part");
            return Ok(None);
        };

        let service = selection
            .part
            .services
            .iter()
            .find(|s| s.service_name == service_name);

        match service {
            Some(service) if service.has_format(ZARR_FORMAT) => Ok(Some(ResolvedService {
                product_id: selection.product.product_id.clone(),
                dataset_id: selection.dataset.dataset_id.clone(),
                version: selection.version.label.clone(),
                service: service.clone(),
            })),
            Some(service) => {
                warn!(
                    dataset_id = %dataset_id,
                    service = %service_name,
                    format = ?service.service_format,
                    "Service is not in zarr format"
                );
                Ok(None)
            }
            None => {
                warn!(dataset_id = %dataset_id, service = %service_name, "No ARCO Zarr service found");
                Ok(None)
            }
        }
    }

    /// Build the catalog entry for one target, or `None` when the target has
    /// no usable delivery variant.
    ///
    /// The dimension schema is taken from the first variable the service
    /// reports. All requested variables must share its coordinate grid;
    /// otherwise the target is rejected with [`CatalogError::GridMismatch`].
    #[instrument(skip(self, target), fields(dataset_id = %target.dataset_id))]
    pub async fn build_entry(&self, target: &TargetSpec) -> Result<Option<CatalogEntry>> {
        target.validate()?;
        info!("Querying dataset");

        let Some(resolved) = self
            .resolve_service(&target.dataset_id, &target.preferred_service)
            .await?
        else {
            return Ok(None);
        };
        let service = &resolved.service;
        info!(url = %service.uri, version = ?resolved.version, "Resolved service");

        let variables: BTreeMap<String, VariableDescriptor> = service
            .variables
            .iter()
            .filter(|v| target.wants(&v.short_name))
            .map(|v| {
                (
                    v.short_name.clone(),
                    VariableDescriptor::new(v.standard_name.clone(), v.units.clone()),
                )
            })
            .collect();

        let Some(reference) = service.variables.first() else {
            warn!("Service reports no variables");
            return Ok(None);
        };

        let reference_ids = reference.coordinate_ids();
        for variable in service.variables.iter().filter(|v| target.wants(&v.short_name)) {
            if variable.coordinate_ids() != reference_ids {
                return Err(CatalogError::GridMismatch {
                    dataset: target.dataset_id.clone(),
                    variable: variable.short_name.clone(),
                    reference: reference.short_name.clone(),
                });
            }
        }

        let mut dimensions = BTreeMap::new();
        for coordinate in &reference.coordinates {
            dimensions.insert(coordinate.coordinate_id.clone(), coordinate.to_descriptor()?);
        }

        Ok(Some(CatalogEntry {
            id: target.dataset_id.clone(),
            product: resolved.product_id,
            label: target.label.clone(),
            zarr_url: service.uri.clone(),
            variables,
            dimensions,
        }))
    }

    /// Build a catalog over targets in order.
    ///
    /// Targets without an entry are skipped; errors for one target are
    /// logged and do not affect the others.
    pub async fn build_catalog(&self, targets: &[TargetSpec]) -> Catalog {
        let mut entries = Vec::with_capacity(targets.len());

        for target in targets {
            match self.build_entry(target).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {
                    info!(dataset_id = %target.dataset_id, "Skipping target without zarr service");
                }
                Err(e) => {
                    error!(dataset_id = %target.dataset_id, error = %e, "Failed to build catalog entry");
                }
            }
        }

        info!(
            datasets = entries.len(),
            targets = targets.len(),
            "Catalog built"
        );
        Catalog::new(entries)
    }
}
