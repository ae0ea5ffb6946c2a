//! Transcode configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use ocean_common::AxisRole;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscodeError};

/// Dataset id of the global 1/12° surface currents analysis/forecast.
pub const DEFAULT_DATASET_ID: &str = "cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i";

/// Inclusive depth band in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

impl DepthRange {
    pub fn contains(&self, depth: f64) -> bool {
        depth >= self.min && depth <= self.max
    }
}

impl Default for DepthRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.5 }
    }
}

/// Target chunk length per axis role.
///
/// Unknown axis keys are rejected when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkSizes {
    pub time: u64,
    pub depth: u64,
    pub latitude: u64,
    pub longitude: u64,
}

impl Default for ChunkSizes {
    fn default() -> Self {
        Self {
            time: 1,
            depth: 1,
            latitude: 170,
            longitude: 240,
        }
    }
}

impl ChunkSizes {
    pub fn for_axis(&self, axis: AxisRole) -> u64 {
        match axis {
            AxisRole::Time => self.time,
            AxisRole::Depth => self.depth,
            AxisRole::Latitude => self.latitude,
            AxisRole::Longitude => self.longitude,
        }
    }
}

/// Floating-point width of the written arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Float32,
    Float64,
}

impl Precision {
    /// Zarr v2 dtype string.
    pub fn zarr_dtype(&self) -> &'static str {
        match self {
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    pub fn element_size(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Round a value to this precision.
    #[inline]
    pub fn round(&self, value: f64) -> f64 {
        match self {
            Self::Float32 => value as f32 as f64,
            Self::Float64 => value,
        }
    }
}

/// Compression codec for written chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression.
    None,
    /// Zlib (deflate with zlib header).
    #[default]
    Zlib,
    /// Gzip (deflate with gzip header).
    Gzip,
}

impl Compression {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "zlib" => Some(Self::Zlib),
            "gzip" => Some(Self::Gzip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_compression_level() -> u32 {
    5
}

/// Everything needed to produce one local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeSpec {
    /// Provider key of the dataset.
    pub dataset_id: String,
    /// Data variables to keep, in output order.
    pub variables: Vec<String>,
    #[serde(default)]
    pub depth_range: DepthRange,
    /// Block size for latitude/longitude averaging.
    pub coarsening_factor: usize,
    #[serde(default)]
    pub chunk_sizes: ChunkSizes,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub compression: Compression,
    /// Compression level (1-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Directory of the local store. Replaced on every run.
    pub destination: PathBuf,
    /// Upper bound on the store's total size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_store_bytes: Option<u64>,
}

impl TranscodeSpec {
    /// Surface currents of the global analysis/forecast, coarsened to 1/4°.
    pub fn surface_currents(destination: impl Into<PathBuf>) -> Self {
        Self {
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            variables: vec!["uo".to_string(), "vo".to_string()],
            depth_range: DepthRange::default(),
            coarsening_factor: 3,
            chunk_sizes: ChunkSizes::default(),
            precision: Precision::Float32,
            compression: Compression::Zlib,
            compression_level: default_compression_level(),
            destination: destination.into(),
            max_store_bytes: None,
        }
    }

    /// Apply overrides from environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TRANSCODE_DESTINATION") {
            if !val.is_empty() {
                self.destination = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("TRANSCODE_COARSENING_FACTOR") {
            if let Ok(factor) = val.parse() {
                self.coarsening_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("TRANSCODE_COMPRESSION") {
            if let Some(compression) = Compression::parse(&val) {
                self.compression = compression;
            }
        }

        if let Ok(val) = std::env::var("TRANSCODE_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                self.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("TRANSCODE_MAX_STORE_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.max_store_bytes = Some(bytes);
            }
        }
    }

    /// Validate settings. Runs before any remote call.
    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.trim().is_empty() {
            return Err(TranscodeError::invalid_config("dataset_id must not be empty"));
        }

        if self.variables.is_empty() {
            return Err(TranscodeError::invalid_config("at least one variable is required"));
        }

        let mut seen = HashSet::new();
        for name in &self.variables {
            if name.trim().is_empty() {
                return Err(TranscodeError::invalid_config("variable names must not be empty"));
            }
            if AxisRole::ALL.iter().any(|a| a.canonical_name() == name) {
                return Err(TranscodeError::invalid_config(format!(
                    "'{}' is a coordinate, not a data variable",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(TranscodeError::invalid_config(format!(
                    "variable '{}' listed twice",
                    name
                )));
            }
        }

        let DepthRange { min, max } = self.depth_range;
        if !min.is_finite() || !max.is_finite() {
            return Err(TranscodeError::invalid_config("depth_range bounds must be finite"));
        }
        if min > max {
            return Err(TranscodeError::invalid_config(format!(
                "depth_range min {} exceeds max {}",
                min, max
            )));
        }

        if self.coarsening_factor == 0 {
            return Err(TranscodeError::invalid_config("coarsening_factor must be > 0"));
        }

        for axis in AxisRole::ALL {
            if self.chunk_sizes.for_axis(axis) == 0 {
                return Err(TranscodeError::invalid_config(format!(
                    "chunk size for {} must be > 0",
                    axis
                )));
            }
        }

        if self.compression != Compression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err(TranscodeError::invalid_config("compression_level must be 1-9"));
        }

        if self.destination.as_os_str().is_empty() {
            return Err(TranscodeError::invalid_config("destination must not be empty"));
        }

        if self.max_store_bytes == Some(0) {
            return Err(TranscodeError::invalid_config("max_store_bytes must be > 0"));
        }

        Ok(())
    }

    /// Names every written store must contain.
    pub fn expected_arrays(&self) -> Vec<String> {
        let mut names: Vec<String> = AxisRole::ALL
            .iter()
            .map(|a| a.canonical_name().to_string())
            .collect();
        names.extend(self.variables.iter().cloned());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_currents_defaults() {
        let spec = TranscodeSpec::surface_currents("public/data/currents.zarr");
        assert!(spec.validate().is_ok());
        assert_eq!(spec.chunk_sizes, ChunkSizes::default());
        assert_eq!(spec.compression, Compression::Zlib);
        assert_eq!(spec.compression_level, 5);
        assert_eq!(spec.expected_arrays().len(), 6);
    }

    #[test]
    fn test_validate_rejects_bad_specs() {
        let base = TranscodeSpec::surface_currents("out.zarr");

        let mut spec = base.clone();
        spec.coarsening_factor = 0;
        assert!(matches!(spec.validate(), Err(TranscodeError::InvalidConfig(_))));

        let mut spec = base.clone();
        spec.depth_range = DepthRange { min: 5.0, max: 1.0 };
        assert!(spec.validate().is_err());

        let mut spec = base.clone();
        spec.depth_range.max = f64::NAN;
        assert!(spec.validate().is_err());

        let mut spec = base.clone();
        spec.chunk_sizes.latitude = 0;
        assert!(spec.validate().is_err());

        let mut spec = base.clone();
        spec.compression_level = 10;
        assert!(spec.validate().is_err());

        let mut spec = base.clone();
        spec.variables.push("uo".to_string());
        assert!(spec.validate().is_err());

        let mut spec = base.clone();
        spec.variables = vec!["latitude".to_string()];
        assert!(spec.validate().is_err());

        let mut spec = base;
        spec.variables.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_level_ignored_without_compression() {
        let mut spec = TranscodeSpec::surface_currents("out.zarr");
        spec.compression = Compression::None;
        spec.compression_level = 0;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let spec: TranscodeSpec = serde_json::from_value(serde_json::json!({
            "dataset_id": "d",
            "variables": ["uo"],
            "coarsening_factor": 2,
            "destination": "out.zarr"
        }))
        .unwrap();
        assert_eq!(spec.precision, Precision::Float32);
        assert_eq!(spec.compression_level, 5);
        assert_eq!(spec.depth_range, DepthRange { min: 0.0, max: 0.5 });
    }

    #[test]
    fn test_unknown_chunk_axis_rejected() {
        let result: std::result::Result<ChunkSizes, _> = serde_json::from_value(serde_json::json!({
            "time": 1, "depth": 1, "latitude": 170, "longitude": 240, "band": 3
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_compression_parse() {
        assert_eq!(Compression::parse("ZLIB"), Some(Compression::Zlib));
        assert_eq!(Compression::parse("none"), Some(Compression::None));
        assert_eq!(Compression::parse("blosc"), None);
        assert_eq!(Precision::Float32.round(0.1), 0.1_f32 as f64);
    }
}
