//! Describe-document fixtures.
//!
//! Builders for JSON documents shaped like the output of the remote
//! metadata provider's `describe` command. Documents are plain
//! `serde_json::Value`s so tests can mutate them before deserializing.

use serde_json::{json, Value};

/// Dataset id of the global surface currents analysis/forecast.
pub const CURRENTS_DATASET_ID: &str = "cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i";

/// Parent product of [`CURRENTS_DATASET_ID`].
pub const CURRENTS_PRODUCT_ID: &str = "GLOBAL_ANALYSISFORECAST_PHY_001_024";

/// Store URL of the time-chunked delivery variant.
pub const TIME_SERIES_URL: &str =
    "https://s3.waw3-1.cloudferro.com/mdl-arco-time-013/arco/GLOBAL_ANALYSISFORECAST_PHY_001_024/cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i_202406/timeChunked.zarr";

/// Store URL of the geo-chunked delivery variant.
pub const GEO_SERIES_URL: &str =
    "https://s3.waw3-1.cloudferro.com/mdl-arco-geo-013/arco/GLOBAL_ANALYSISFORECAST_PHY_001_024/cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i_202406/geoChunked.zarr";

/// First depth levels of the global model grid, in metres.
pub const MODEL_DEPTHS: [f64; 4] = [0.494025, 1.541375, 2.645669, 3.819495];

/// A regular coordinate (min/max/step).
pub fn regular_coordinate(
    id: &str,
    axis: &str,
    unit: &str,
    min: f64,
    max: f64,
    step: f64,
    chunk: u64,
) -> Value {
    json!({
        "coordinate_id": id,
        "axis": axis,
        "coordinate_unit": unit,
        "minimum_value": min,
        "maximum_value": max,
        "step": step,
        "values": null,
        "chunking_length": chunk,
    })
}

/// A coordinate listing its values explicitly.
pub fn explicit_coordinate(id: &str, axis: &str, unit: &str, values: &[f64], chunk: u64) -> Value {
    json!({
        "coordinate_id": id,
        "axis": axis,
        "coordinate_unit": unit,
        "minimum_value": values.first(),
        "maximum_value": values.last(),
        "step": null,
        "values": values,
        "chunking_length": chunk,
    })
}

/// The four coordinates of the global 1/12° currents grid.
///
/// # Arguments
/// * `spatial_chunk` - Chunk length reported for latitude and longitude
///
/// # Returns
/// Coordinates in provider order: time, depth, latitude, longitude.
pub fn currents_coordinates(spatial_chunk: u64) -> Vec<Value> {
    vec![
        regular_coordinate(
            "time",
            "t",
            "milliseconds since 1970-01-01 00:00:00Z (no leap seconds)",
            1_698_796_800_000.0,
            1_717_200_000_000.0,
            21_600_000.0,
            1,
        ),
        explicit_coordinate("depth", "z", "m", &MODEL_DEPTHS, 1),
        regular_coordinate(
            "latitude",
            "y",
            "degrees_north",
            -80.0,
            90.0,
            0.083333,
            spatial_chunk,
        ),
        regular_coordinate(
            "longitude",
            "x",
            "degrees_east",
            -180.0,
            179.91667,
            0.083333,
            spatial_chunk,
        ),
    ]
}

/// A provider variable over the given coordinates.
pub fn variable(short_name: &str, standard_name: &str, units: &str, coordinates: Vec<Value>) -> Value {
    json!({
        "short_name": short_name,
        "standard_name": standard_name,
        "units": units,
        "bbox": [-180.0, -80.0, 179.91667, 90.0],
        "coordinates": coordinates,
    })
}

/// The current variables carried by every delivery variant.
pub fn currents_variables(spatial_chunk: u64) -> Vec<Value> {
    vec![
        variable(
            "uo",
            "eastward_sea_water_velocity",
            "m s-1",
            currents_coordinates(spatial_chunk),
        ),
        variable(
            "vo",
            "northward_sea_water_velocity",
            "m s-1",
            currents_coordinates(spatial_chunk),
        ),
        variable(
            "vsdx",
            "sea_surface_wave_stokes_drift_x_velocity",
            "m s-1",
            currents_coordinates(spatial_chunk),
        ),
    ]
}

/// A delivery variant.
pub fn service(name: &str, format: Option<&str>, uri: &str, variables: Vec<Value>) -> Value {
    json!({
        "service_name": name,
        "service_short_name": name,
        "service_format": format,
        "uri": uri,
        "variables": variables,
    })
}

/// A one-product, one-dataset, one-version, one-part describe document.
pub fn describe_document(product_id: &str, dataset_id: &str, services: Vec<Value>) -> Value {
    json!({
        "products": [{
            "product_id": product_id,
            "title": "Global Ocean Physics Analysis and Forecast",
            "datasets": [{
                "dataset_id": dataset_id,
                "dataset_name": "daily mean fields from Global Ocean Physics Analysis and Forecast",
                "versions": [{
                    "label": "202406",
                    "parts": [{
                        "name": "default",
                        "released_date": "2024-06-01T00:00:00Z",
                        "services": services,
                    }],
                }],
            }],
        }],
    })
}

/// Describe document for the currents dataset with both zarr variants and
/// a non-zarr file service.
pub fn currents_describe_document() -> Value {
    describe_document(
        CURRENTS_PRODUCT_ID,
        CURRENTS_DATASET_ID,
        vec![
            service(
                "original-files",
                Some("netcdf"),
                "https://s3.waw3-1.cloudferro.com/mdl-native-13/native/GLOBAL_ANALYSISFORECAST_PHY_001_024",
                vec![],
            ),
            service(
                "arco-geo-series",
                Some("zarr"),
                GEO_SERIES_URL,
                currents_variables(2048),
            ),
            service(
                "arco-time-series",
                Some("zarr"),
                TIME_SERIES_URL,
                currents_variables(32),
            ),
        ],
    )
}

/// Merge several single-product documents into one.
pub fn merge_documents(documents: &[Value]) -> Value {
    let products: Vec<Value> = documents
        .iter()
        .filter_map(|d| d["products"].as_array())
        .flatten()
        .cloned()
        .collect();
    json!({ "products": products })
}
