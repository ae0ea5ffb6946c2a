//! Target dataset specifications.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// One dataset to catalog, as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Provider key of the dataset (e.g. "cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i").
    pub dataset_id: String,
    /// Human-readable label shown by the browser client.
    pub label: String,
    /// Short names of the variables of interest.
    pub variables: Vec<String>,
    /// Name of the delivery variant to publish (e.g. "arco-geo-series").
    pub preferred_service: String,
}

impl TargetSpec {
    /// Validate the target before any remote call is made.
    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.trim().is_empty() {
            return Err(CatalogError::invalid_config("dataset_id must not be empty"));
        }

        if self.preferred_service.trim().is_empty() {
            return Err(CatalogError::invalid_config(format!(
                "preferred_service must not be empty for {}",
                self.dataset_id
            )));
        }

        if self.variables.is_empty() {
            return Err(CatalogError::invalid_config(format!(
                "no variables requested for {}",
                self.dataset_id
            )));
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            if variable.trim().is_empty() {
                return Err(CatalogError::invalid_config(format!(
                    "empty variable name requested for {}",
                    self.dataset_id
                )));
            }
            if !seen.insert(variable.as_str()) {
                return Err(CatalogError::invalid_config(format!(
                    "variable {} requested twice for {}",
                    variable, self.dataset_id
                )));
            }
        }

        Ok(())
    }

    /// Whether a variable short name was requested by this target.
    pub fn wants(&self, short_name: &str) -> bool {
        self.variables.iter().any(|v| v == short_name)
    }
}
