//! Zarr v2 consolidated metadata (`.zmetadata`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cf::{json_number, ARRAY_DIMENSIONS};
use crate::error::{Result, TranscodeError};

/// Key of the consolidated metadata document at the store root.
pub const ZMETADATA: &str = ".zmetadata";

/// Version tag written to `zarr_consolidated_format`.
pub const CONSOLIDATED_FORMAT: u32 = 1;

/// Contents of a `.zarray` document that this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZarrayV2 {
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub dtype: String,
    #[serde(default)]
    pub fill_value: Value,
    #[serde(default)]
    pub compressor: Option<Value>,
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default = "default_order")]
    pub order: String,
    pub zarr_format: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_separator: Option<String>,
}

fn default_order() -> String {
    "C".to_string()
}

impl ZarrayV2 {
    /// Fill value as a number, if it is one.
    pub fn fill_number(&self) -> Option<f64> {
        json_number(&self.fill_value)
    }
}

/// One array described by consolidated metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEntry {
    pub name: String,
    pub zarray: ZarrayV2,
    /// Dimension names from `_ARRAY_DIMENSIONS`.
    pub dims: Vec<String>,
    /// All `.zattrs` attributes, including `_ARRAY_DIMENSIONS`.
    pub attributes: Map<String, Value>,
}

/// Parsed `.zmetadata` of a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedMetadata {
    /// Group attributes.
    pub attributes: Map<String, Value>,
    /// Arrays directly under the group, keyed by name.
    pub arrays: BTreeMap<String, ArrayEntry>,
}

#[derive(Deserialize)]
struct RawConsolidated {
    metadata: Map<String, Value>,
    zarr_consolidated_format: u32,
}

impl ConsolidatedMetadata {
    /// Parse a `.zmetadata` document.
    ///
    /// Only arrays at the top level of the group are listed; nested groups
    /// are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: RawConsolidated = serde_json::from_slice(bytes)?;
        if raw.zarr_consolidated_format != CONSOLIDATED_FORMAT {
            return Err(TranscodeError::zarr(format!(
                "unsupported zarr_consolidated_format {}",
                raw.zarr_consolidated_format
            )));
        }

        let attributes = match raw.metadata.get(".zattrs") {
            Some(Value::Object(attrs)) => attrs.clone(),
            _ => Map::new(),
        };

        let mut arrays = BTreeMap::new();
        for (key, value) in &raw.metadata {
            let Some(name) = key.strip_suffix("/.zarray") else {
                continue;
            };
            if name.contains('/') {
                continue;
            }

            let zarray: ZarrayV2 = serde_json::from_value(value.clone()).map_err(|e| {
                TranscodeError::zarr(format!("invalid .zarray for '{}': {}", name, e))
            })?;

            let attributes = match raw.metadata.get(&format!("{}/.zattrs", name)) {
                Some(Value::Object(attrs)) => attrs.clone(),
                _ => Map::new(),
            };

            let dims = match attributes.get(ARRAY_DIMENSIONS) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|d| d.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        TranscodeError::zarr(format!("non-string dimension name in '{}'", name))
                    })?,
                // Arrays without named dimensions get positional names
                _ => (0..zarray.shape.len())
                    .map(|i| format!("dim_{}", i))
                    .collect(),
            };

            if dims.len() != zarray.shape.len() {
                return Err(TranscodeError::zarr(format!(
                    "'{}' has {} dimension names for {} axes",
                    name,
                    dims.len(),
                    zarray.shape.len()
                )));
            }

            arrays.insert(
                name.to_string(),
                ArrayEntry {
                    name: name.to_string(),
                    zarray,
                    dims,
                    attributes,
                },
            );
        }

        Ok(Self { attributes, arrays })
    }

    pub fn array(&self, name: &str) -> Option<&ArrayEntry> {
        self.arrays.get(name)
    }
}
