//! CF conventions: packed-value decoding and time units.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Attributes describing how values are packed on disk. Values are written
/// decoded, so these never reach an output store.
pub const ENCODING_ATTRIBUTES: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// Attribute listing an array's dimension names in Zarr v2 stores.
pub const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";

/// Packing parameters of one array.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CfEncoding {
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
}

impl CfEncoding {
    /// Read packing parameters from attributes.
    ///
    /// `array_fill` is the store-level fill value, used when the attributes
    /// carry no `_FillValue`.
    pub fn from_attributes(attrs: &Map<String, Value>, array_fill: Option<f64>) -> Self {
        let number = |key: &str| attrs.get(key).and_then(json_number);
        Self {
            scale_factor: number("scale_factor"),
            add_offset: number("add_offset"),
            fill_value: number("_FillValue").or(array_fill),
            missing_value: number("missing_value"),
        }
    }

    /// Decode one stored value: fill and missing become NaN, then
    /// `value * scale_factor + add_offset`.
    #[inline]
    pub fn decode(&self, raw: f64) -> f64 {
        if raw.is_nan() || self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }

    /// Round the fill and missing values to the stored element type.
    ///
    /// Stored values arrive widened to `f64`, so a float32 cell holding
    /// `1e20` reads back as `1.0000000200408773e20` and only compares equal
    /// to a fill value rounded the same way.
    pub fn for_dtype(mut self, dtype: &str) -> Self {
        if dtype.trim_start_matches(['<', '>', '|', '=']) == "f4" {
            let narrow = |v: f64| (v as f32) as f64;
            self.fill_value = self.fill_value.map(narrow);
            self.missing_value = self.missing_value.map(narrow);
        }
        self
    }

    pub fn decode_in_place(&self, values: &mut [f64]) {
        if *self == Self::default() {
            return;
        }
        for value in values.iter_mut() {
            *value = self.decode(*value);
        }
    }
}

/// Parse a JSON number, including the `"NaN"`/`"Infinity"` strings Zarr
/// uses for non-finite fill values.
pub fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

/// Attributes worth carrying to the output: everything except packing
/// parameters and the dimension list.
pub fn descriptive_attributes(attrs: &Map<String, Value>) -> Map<String, Value> {
    attrs
        .iter()
        .filter(|(key, _)| key.as_str() != ARRAY_DIMENSIONS && !ENCODING_ATTRIBUTES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Convert a CF time value (`"<unit> since <reference>"`) to UTC.
///
/// Returns `None` for units this function does not understand.
pub fn decode_time(value: f64, units: &str) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }

    let (unit, reference) = units.split_once(" since ")?;
    let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
        "milliseconds" | "millisecond" | "ms" => 0.001,
        "seconds" | "second" | "secs" | "s" => 1.0,
        "minutes" | "minute" | "mins" => 60.0,
        "hours" | "hour" | "hrs" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        _ => return None,
    };

    let reference = reference.split('(').next().unwrap_or(reference);
    let reference = parse_reference(reference.trim())?;
    let millis = (value * seconds_per_unit * 1000.0).round() as i64;
    Some(reference + Duration::milliseconds(millis))
}

fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let text = text.trim_end_matches('Z').trim_end_matches(" UTC");
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_packed_values() {
        let mut attrs = Map::new();
        attrs.insert("scale_factor".to_string(), json!(0.001));
        attrs.insert("add_offset".to_string(), json!(1.5));
        attrs.insert("_FillValue".to_string(), json!(-32767));

        let encoding = CfEncoding::from_attributes(&attrs, None);
        let mut values = vec![1000.0, -32767.0, 0.0];
        encoding.decode_in_place(&mut values);
        assert!((values[0] - 2.5).abs() < 1e-12);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 1.5);
    }

    #[test]
    fn test_array_fill_used_without_attribute() {
        let encoding = CfEncoding::from_attributes(&Map::new(), Some(1e20));
        assert!(encoding.decode(1e20).is_nan());
        assert_eq!(encoding.decode(0.25), 0.25);
    }

    #[test]
    fn test_float32_fill_matches_widened_value() {
        let mut attrs = Map::new();
        attrs.insert("_FillValue".to_string(), json!(1e20));
        attrs.insert("missing_value".to_string(), json!(-1e20));
        let stored = |v: f64| (v as f32) as f64;

        let encoding = CfEncoding::from_attributes(&attrs, None).for_dtype("<f4");
        assert!(encoding.decode(stored(1e20)).is_nan());
        assert!(encoding.decode(stored(-1e20)).is_nan());
        assert_eq!(encoding.decode(stored(0.5)), 0.5);

        // float64 stores keep the exact fill
        let encoding = CfEncoding::from_attributes(&attrs, None).for_dtype("<f8");
        assert!(encoding.decode(1e20).is_nan());
        assert!(!encoding.decode(stored(1e20)).is_nan());
    }

    #[test]
    fn test_descriptive_attributes_strip_encoding() {
        let mut attrs = Map::new();
        attrs.insert("units".to_string(), json!("m s-1"));
        attrs.insert("_FillValue".to_string(), json!("NaN"));
        attrs.insert("scale_factor".to_string(), json!(1.0));
        attrs.insert(ARRAY_DIMENSIONS.to_string(), json!(["time"]));

        let kept = descriptive_attributes(&attrs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept["units"], "m s-1");
    }

    #[test]
    fn test_json_number() {
        assert!(json_number(&json!("NaN")).unwrap().is_nan());
        assert_eq!(json_number(&json!(3)), Some(3.0));
        assert_eq!(json_number(&json!(null)), None);
    }

    #[test]
    fn test_decode_time() {
        let t = decode_time(648_000.0, "hours since 1950-01-01").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-12-04T00:00:00+00:00");

        let t = decode_time(
            1_717_200_000_000.0,
            "milliseconds since 1970-01-01 00:00:00Z (no leap seconds)",
        )
        .unwrap();
        assert_eq!(t.timestamp(), 1_717_200_000);

        assert!(decode_time(1.0, "fortnights since 1970-01-01").is_none());
        assert!(decode_time(1.0, "hours").is_none());
    }
}
