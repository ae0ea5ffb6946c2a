//! Coordinate axis roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;

/// Categorical role of a coordinate axis.
///
/// Serialized with the single-letter tags the metadata provider reports
/// (`t`, `z`, `y`, `x`); parsing also accepts the long names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisRole {
    Time,
    Depth,
    Latitude,
    Longitude,
}

impl AxisRole {
    /// All roles in the canonical (time, depth, latitude, longitude) order.
    pub const ALL: [AxisRole; 4] = [
        AxisRole::Time,
        AxisRole::Depth,
        AxisRole::Latitude,
        AxisRole::Longitude,
    ];

    /// Provider tag for this role.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Time => "t",
            Self::Depth => "z",
            Self::Latitude => "y",
            Self::Longitude => "x",
        }
    }

    /// Name used for the coordinate array of this role in a store.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Depth => "depth",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    /// Classify a store dimension name (e.g. from `_ARRAY_DIMENSIONS`).
    ///
    /// Returns `None` for dimensions that play none of the four roles.
    pub fn from_dimension_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "time" | "t" => Some(Self::Time),
            "depth" | "z" | "lev" | "deptht" => Some(Self::Depth),
            "latitude" | "lat" | "y" => Some(Self::Latitude),
            "longitude" | "lon" | "x" => Some(Self::Longitude),
            _ => None,
        }
    }
}

impl FromStr for AxisRole {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "t" | "time" => Ok(Self::Time),
            "z" | "depth" => Ok(Self::Depth),
            "y" | "lat" | "latitude" => Ok(Self::Latitude),
            "x" | "lon" | "longitude" => Ok(Self::Longitude),
            _ => Err(SchemaError::UnknownAxis(s.to_string())),
        }
    }
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

impl Serialize for AxisRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for AxisRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
