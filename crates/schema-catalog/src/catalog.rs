//! Catalog document types.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ocean_common::{DimensionDescriptor, VariableDescriptor};

use crate::error::Result;

/// One cataloged dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Dataset identifier.
    pub id: String,
    /// Parent product identifier.
    pub product: String,
    /// Human-readable label from the target configuration.
    pub label: String,
    /// Store URL of the preferred delivery variant.
    pub zarr_url: String,
    /// Requested variables keyed by short name.
    pub variables: BTreeMap<String, VariableDescriptor>,
    /// Grid dimensions keyed by coordinate id.
    pub dimensions: BTreeMap<String, DimensionDescriptor>,
}

/// The catalog document consumed by the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Generation time (UTC).
    pub generated: DateTime<Utc>,
    /// Entries in configured target order.
    pub datasets: Vec<CatalogEntry>,
}

impl Catalog {
    /// Create a catalog stamped with the current time.
    pub fn new(datasets: Vec<CatalogEntry>) -> Self {
        Self {
            generated: Utc::now(),
            datasets,
        }
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the catalog, replacing any previous file at `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Read a previously written catalog.
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
