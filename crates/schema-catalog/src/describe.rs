//! Metadata hierarchy returned by the remote provider.
//!
//! Mirrors the JSON produced by the Copernicus Marine `describe` command:
//! product → dataset → version → part → service → variable → coordinate.
//! Fields this crate does not use are ignored on deserialization.

use serde::{Deserialize, Serialize};

use ocean_common::{AxisRole, DimensionDescriptor, SchemaError};

/// Provider answer for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeResponse {
    #[serde(default)]
    pub products: Vec<ProviderProduct>,
}

impl DescribeResponse {
    /// Restrict the response to products/datasets matching a dataset id.
    ///
    /// Products without a matching dataset are dropped.
    pub fn filter_dataset(&self, dataset_id: &str) -> DescribeResponse {
        let products = self
            .products
            .iter()
            .filter_map(|product| {
                let datasets: Vec<ProviderDataset> = product
                    .datasets
                    .iter()
                    .filter(|d| d.dataset_id == dataset_id)
                    .cloned()
                    .collect();
                if datasets.is_empty() {
                    None
                } else {
                    Some(ProviderProduct {
                        datasets,
                        ..product.clone()
                    })
                }
            })
            .collect();

        DescribeResponse { products }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub product_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub datasets: Vec<ProviderDataset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDataset {
    pub dataset_id: String,
    #[serde(default)]
    pub dataset_name: Option<String>,
    #[serde(default)]
    pub versions: Vec<ProviderVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderVersion {
    /// Release label, e.g. "202406".
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parts: Vec<ProviderPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPart {
    /// Spatial subdivision name, "default" for unsplit datasets.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub released_date: Option<String>,
    #[serde(default)]
    pub services: Vec<ProviderService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderService {
    pub service_name: String,
    #[serde(default)]
    pub service_format: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub variables: Vec<ProviderVariable>,
}

impl ProviderService {
    /// Whether this variant is delivered in the given storage format.
    pub fn has_format(&self, format: &str) -> bool {
        self.service_format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case(format))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderVariable {
    pub short_name: String,
    #[serde(default)]
    pub standard_name: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<ProviderCoordinate>,
}

impl ProviderVariable {
    /// Sorted coordinate ids of this variable's grid.
    pub fn coordinate_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .coordinates
            .iter()
            .map(|c| c.coordinate_id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCoordinate {
    pub coordinate_id: String,
    pub axis: String,
    #[serde(default)]
    pub coordinate_unit: Option<String>,
    #[serde(default)]
    pub minimum_value: Option<f64>,
    #[serde(default)]
    pub maximum_value: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    /// Explicit values; the provider may report numbers or strings.
    #[serde(default)]
    pub values: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub chunking_length: Option<u64>,
}

impl ProviderCoordinate {
    /// Convert to a dimension descriptor.
    ///
    /// Explicit values win over the regular range; a regular range only gets
    /// a size when a step is reported.
    pub fn to_descriptor(&self) -> Result<DimensionDescriptor, SchemaError> {
        let axis: AxisRole = self.axis.parse()?;

        let descriptor = match &self.values {
            Some(raw) => {
                let values = raw
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            SchemaError::invalid_dimension(
                                &self.coordinate_id,
                                format!("non-numeric coordinate value {}", v),
                            )
                        })
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                DimensionDescriptor::explicit(axis, values)
            }
            None => DimensionDescriptor::regular(
                axis,
                self.minimum_value,
                self.maximum_value,
                self.step.filter(|s| *s != 0.0),
            ),
        };

        descriptor.validate(&self.coordinate_id)?;
        Ok(descriptor
            .with_chunk_size(self.chunking_length)
            .with_units(self.coordinate_unit.clone()))
    }
}
