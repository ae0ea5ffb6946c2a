//! Dimension descriptors: the portable description of one coordinate axis.

use serde::{Deserialize, Serialize};

use crate::axis::AxisRole;
use crate::error::{SchemaError, SchemaResult};

/// How the coordinate values of an axis are described.
///
/// Exactly one form is populated. Serialized flattened into the owning
/// [`DimensionDescriptor`], so the JSON carries either `values` or
/// `min`/`max`/`step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionExtent {
    /// Irregular axis with explicit ordered coordinate values.
    Values { values: Vec<f64> },
    /// Regular axis described by its bounds and spacing.
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
}

/// One coordinate axis of a variable's grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDescriptor {
    pub axis: AxisRole,
    /// Number of samples along the axis; `None` only when a regular axis
    /// reports no step.
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extent: DimensionExtent,
    /// Native chunk length reported by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl DimensionDescriptor {
    /// Describe an irregular axis by its explicit coordinate values.
    pub fn explicit(axis: AxisRole, values: Vec<f64>) -> Self {
        Self {
            axis,
            size: Some(values.len() as u64),
            extent: DimensionExtent::Values { values },
            chunk_size: None,
            units: None,
        }
    }

    /// Describe a regular axis. The size is derived when a step is present.
    pub fn regular(axis: AxisRole, min: Option<f64>, max: Option<f64>, step: Option<f64>) -> Self {
        Self {
            axis,
            size: regular_axis_size(min, max, step),
            extent: DimensionExtent::Range { min, max, step },
            chunk_size: None,
            units: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<u64>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = units.filter(|u| !u.is_empty());
        self
    }

    /// Explicit coordinate values, if this is an irregular axis.
    pub fn values(&self) -> Option<&[f64]> {
        match &self.extent {
            DimensionExtent::Values { values } => Some(values),
            DimensionExtent::Range { .. } => None,
        }
    }

    /// Check the size invariant against the extent.
    pub fn validate(&self, name: &str) -> SchemaResult<()> {
        let expected = match &self.extent {
            DimensionExtent::Values { values } => Some(values.len() as u64),
            DimensionExtent::Range { min, max, step } => {
                if step.is_none() {
                    return match self.size {
                        None => Ok(()),
                        Some(_) => Err(SchemaError::invalid_dimension(
                            name,
                            "size reported for a regular axis without a step",
                        )),
                    };
                }
                let size = regular_axis_size(*min, *max, *step);
                if size.is_none() {
                    return Err(SchemaError::invalid_dimension(
                        name,
                        format!(
                            "step {:?} reported without a usable range ({:?}..{:?})",
                            step, min, max
                        ),
                    ));
                }
                size
            }
        };

        if self.size != expected {
            return Err(SchemaError::invalid_dimension(
                name,
                format!("size {:?} does not match extent ({:?})", self.size, expected),
            ));
        }

        Ok(())
    }
}

/// Number of samples on a regular axis: `floor(|max - min| / |step|) + 1`.
///
/// Descending axes count the same as ascending ones. Quotients within
/// floating-point noise of an integer are snapped to it, so steps like
/// `1/12` degree do not lose the final sample. Returns `None` when any of
/// the three values is missing or not finite, or the step is zero.
pub fn regular_axis_size(min: Option<f64>, max: Option<f64>, step: Option<f64>) -> Option<u64> {
    let (min, max, step) = (min?, max?, step?);
    if !(step.is_finite() && step != 0.0 && min.is_finite() && max.is_finite()) {
        return None;
    }

    let quotient = (max - min).abs() / step.abs();
    let nearest = quotient.round();
    let intervals = if (quotient - nearest).abs() <= 1e-9 * nearest.abs().max(1.0) {
        nearest
    } else {
        quotient.floor()
    };

    Some(intervals as u64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_size() {
        let dim = DimensionDescriptor::regular(AxisRole::Longitude, Some(0.0), Some(10.0), Some(2.0));
        assert_eq!(dim.size, Some(6));
        assert!(dim.validate("longitude").is_ok());
    }

    #[test]
    fn test_regular_size_floors_partial_step() {
        assert_eq!(regular_axis_size(Some(0.0), Some(10.0), Some(3.0)), Some(4));
    }

    #[test]
    fn test_regular_size_snaps_float_noise() {
        // Global 1/12 degree grid: -180 .. 179.9166 has 4320 samples.
        let step = 1.0 / 12.0;
        let max = -180.0 + 4319.0 * step;
        assert_eq!(regular_axis_size(Some(-180.0), Some(max), Some(step)), Some(4320));
    }

    #[test]
    fn test_descending_axis_size() {
        assert_eq!(regular_axis_size(Some(90.0), Some(-80.0), Some(-0.5)), Some(341));
        assert_eq!(regular_axis_size(Some(10.0), Some(0.0), Some(2.0)), Some(6));

        let dim = DimensionDescriptor::regular(AxisRole::Latitude, Some(90.0), Some(-80.0), Some(-0.5));
        assert_eq!(dim.size, Some(341));
        assert!(dim.validate("latitude").is_ok());
    }

    #[test]
    fn test_step_without_range_is_invalid() {
        let dim = DimensionDescriptor::regular(AxisRole::Longitude, None, Some(10.0), Some(2.0));
        assert_eq!(dim.size, None);
        assert!(dim.validate("longitude").is_err());
    }

    #[test]
    fn test_regular_without_step_has_unknown_size() {
        let dim = DimensionDescriptor::regular(AxisRole::Time, Some(0.0), Some(10.0), None);
        assert_eq!(dim.size, None);
        assert!(dim.validate("time").is_ok());
        assert_eq!(regular_axis_size(Some(0.0), Some(1.0), Some(0.0)), None);
    }

    #[test]
    fn test_explicit_size() {
        let dim = DimensionDescriptor::explicit(AxisRole::Depth, vec![1.0, 2.0, 3.0]);
        assert_eq!(dim.size, Some(3));
        assert_eq!(dim.values(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_validate_rejects_wrong_size() {
        let mut dim = DimensionDescriptor::explicit(AxisRole::Depth, vec![1.0, 2.0]);
        dim.size = Some(5);
        assert!(dim.validate("depth").is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let dim = DimensionDescriptor::regular(AxisRole::Latitude, Some(-80.0), Some(90.0), Some(0.5))
            .with_chunk_size(Some(512))
            .with_units(Some("degrees_north".to_string()));

        let json = serde_json::to_value(&dim).unwrap();
        assert_eq!(json["axis"], "y");
        assert_eq!(json["size"], 341);
        assert_eq!(json["min"], -80.0);
        assert_eq!(json["step"], 0.5);
        assert_eq!(json["chunk_size"], 512);
        assert_eq!(json["units"], "degrees_north");
        assert!(json.get("values").is_none());

        let explicit = DimensionDescriptor::explicit(AxisRole::Depth, vec![0.494]);
        let json = serde_json::to_value(&explicit).unwrap();
        assert_eq!(json["values"], serde_json::json!([0.494]));
        assert!(json.get("min").is_none());
        assert!(json.get("chunk_size").is_none());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let explicit: DimensionDescriptor =
            serde_json::from_str(r#"{"axis":"z","size":2,"values":[0.5,1.5]}"#).unwrap();
        assert_eq!(explicit.values(), Some(&[0.5, 1.5][..]));

        let regular: DimensionDescriptor =
            serde_json::from_str(r#"{"axis":"t","size":null,"min":0.0,"max":6.0}"#).unwrap();
        assert_eq!(
            regular.extent,
            DimensionExtent::Range {
                min: Some(0.0),
                max: Some(6.0),
                step: None
            }
        );
        assert_eq!(regular.size, None);
    }
}
