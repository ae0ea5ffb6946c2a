//! Variable descriptors.

use serde::{Deserialize, Serialize};

/// Descriptive metadata for one physical variable. Carries no array data.
///
/// The short name is the key of the map that holds these descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// CF standard name (e.g. "eastward_sea_water_velocity").
    pub standard_name: Option<String>,
    /// Physical units (e.g. "m s-1").
    pub units: Option<String>,
}

impl VariableDescriptor {
    pub fn new(standard_name: Option<String>, units: Option<String>) -> Self {
        Self {
            standard_name,
            units,
        }
    }
}
