//! Reading consolidated Zarr v2 groups into datasets.

use std::collections::BTreeMap;
use std::sync::Arc;

use ocean_common::AxisRole;
use tracing::{debug, info};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{ReadableStorageTraits, StoreKey};

use super::OpenRequest;
use crate::cf::{descriptive_attributes, CfEncoding};
use crate::error::{Result, TranscodeError};
use crate::lazy::{ArraySource, LazyArray};
use crate::metadata::{ArrayEntry, ConsolidatedMetadata, ZMETADATA};
use crate::stages::{Coordinate, Dataset, OpenedDataset};

/// Read a subset as `f64`, dispatching on the stored element type.
macro_rules! retrieve_as_f64 {
    ($array:expr, $subset:expr, { $($variant:ident => $ty:ty),+ $(,)? }) => {
        match $array.data_type() {
            $(
                DataType::$variant => $array
                    .retrieve_array_subset_elements::<$ty>($subset)
                    .map(|values| values.into_iter().map(|v| v as f64).collect::<Vec<f64>>())
                    .map_err(|e| TranscodeError::zarr(e.to_string())),
            )+
            other => Err(TranscodeError::zarr(format!(
                "unsupported data type {:?}",
                other
            ))),
        }
    };
}

/// One Zarr array, read as CF-decoded `f64`.
pub struct ZarrArraySource<S: ?Sized> {
    array: Array<S>,
    shape: Vec<u64>,
    encoding: CfEncoding,
}

impl<S: ReadableStorageTraits + ?Sized + 'static> ZarrArraySource<S> {
    pub fn open(store: Arc<S>, name: &str, encoding: CfEncoding) -> Result<Self> {
        let array = Array::open(store, &format!("/{}", name))
            .map_err(|e| TranscodeError::zarr(format!("cannot open '{}': {}", name, e)))?;
        let shape = array.shape().to_vec();
        Ok(Self {
            array,
            shape,
            encoding,
        })
    }

    pub fn encoding(&self) -> &CfEncoding {
        &self.encoding
    }
}

impl<S: ReadableStorageTraits + Send + Sync + ?Sized + 'static> ArraySource for ZarrArraySource<S> {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn read_region(&self, start: &[u64], shape: &[u64]) -> Result<Vec<f64>> {
        let subset = ArraySubset::new_with_start_shape(start.to_vec(), shape.to_vec())
            .map_err(|e| TranscodeError::zarr(e.to_string()))?;

        let mut values = retrieve_as_f64!(self.array, &subset, {
            Int8 => i8,
            Int16 => i16,
            Int32 => i32,
            Int64 => i64,
            UInt8 => u8,
            UInt16 => u16,
            UInt32 => u32,
            UInt64 => u64,
            Float32 => f32,
            Float64 => f64,
        })?;

        self.encoding.decode_in_place(&mut values);
        Ok(values)
    }
}

/// A consolidated Zarr v2 group.
///
/// Arrays are listed from `.zmetadata`; no directory listing is needed, so
/// the same reader works for local directories and plain HTTP stores.
pub struct ZarrGroupReader<S: ?Sized> {
    store: Arc<S>,
    metadata: ConsolidatedMetadata,
}

impl<S: ReadableStorageTraits + Send + Sync + ?Sized + 'static> ZarrGroupReader<S> {
    /// Read the consolidated metadata at the root of `store`.
    pub fn open(store: Arc<S>) -> Result<Self> {
        let key = StoreKey::new(ZMETADATA).map_err(|e| TranscodeError::storage(e.to_string()))?;
        let bytes = store
            .get(&key)
            .map_err(|e| TranscodeError::provider(format!("cannot read {}: {}", ZMETADATA, e)))?
            .ok_or_else(|| {
                TranscodeError::provider(format!("store has no {} (not consolidated?)", ZMETADATA))
            })?;

        let metadata = ConsolidatedMetadata::parse(&bytes)?;
        debug!(arrays = metadata.arrays.len(), "Read consolidated metadata");
        Ok(Self { store, metadata })
    }

    pub fn metadata(&self) -> &ConsolidatedMetadata {
        &self.metadata
    }

    /// The coordinate array playing `role`: the canonical name if present,
    /// otherwise the first one-dimensional array whose name classifies as
    /// that role.
    pub fn find_coordinate(&self, role: AxisRole) -> Option<&ArrayEntry> {
        if let Some(entry) = self.metadata.array(role.canonical_name()) {
            return Some(entry);
        }
        self.metadata
            .arrays
            .values()
            .filter(|entry| entry.zarray.shape.len() == 1)
            .find(|entry| AxisRole::from_dimension_name(&entry.name) == Some(role))
    }

    /// Open the requested variables, read the coordinates and apply the
    /// depth band.
    ///
    /// Coordinates are renamed to their canonical names, and variable
    /// dimensions are renamed to match.
    pub fn read_dataset(&self, request: &OpenRequest) -> Result<OpenedDataset> {
        let mut coordinates = Vec::with_capacity(AxisRole::ALL.len());
        let mut renames = BTreeMap::new();

        for role in AxisRole::ALL {
            let entry = self
                .find_coordinate(role)
                .ok_or(TranscodeError::MissingAxis { axis: role })?;

            // Coordinate values such as latitude 0 must not be masked by a
            // store-level fill value.
            let encoding =
                CfEncoding::from_attributes(&entry.attributes, None).for_dtype(&entry.zarray.dtype);
            let source = ZarrArraySource::open(self.store.clone(), &entry.name, encoding)?;
            let values = source.read_region(&[0], source.shape())?;

            debug!(
                role = %role,
                source_name = %entry.name,
                len = values.len(),
                "Read coordinate"
            );
            renames.insert(entry.name.clone(), role.canonical_name());
            coordinates.push(Coordinate::new(
                role,
                values,
                descriptive_attributes(&entry.attributes),
            )?);
        }

        let mut variables = Vec::with_capacity(request.variables.len());
        for name in &request.variables {
            let entry = self
                .metadata
                .array(name)
                .ok_or_else(|| TranscodeError::MissingVariable(name.clone()))?;

            let encoding = CfEncoding::from_attributes(&entry.attributes, entry.zarray.fill_number())
                .for_dtype(&entry.zarray.dtype);
            let source = ZarrArraySource::open(self.store.clone(), name, encoding)?;

            let dims = entry
                .dims
                .iter()
                .map(|dim| {
                    renames
                        .get(dim)
                        .map(|canonical| canonical.to_string())
                        .unwrap_or_else(|| dim.clone())
                })
                .collect();

            variables.push(LazyArray::new(
                name.clone(),
                dims,
                Arc::new(source),
                descriptive_attributes(&entry.attributes),
            )?);
        }

        let dataset = Dataset::new(coordinates, variables, self.metadata.attributes.clone());
        info!(
            dataset_id = %request.dataset_id,
            sizes = ?dataset.sizes(),
            variables = ?request.variables,
            "Opened dataset"
        );

        OpenedDataset::open(dataset, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DepthRange;
    use test_utils::{CurrentsFixture, SourceArray, SourceStore};
    use zarrs_filesystem::FilesystemStore;

    fn request(variables: &[&str]) -> OpenRequest {
        OpenRequest {
            dataset_id: "fixture".to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            depth_range: DepthRange { min: 0.0, max: 0.5 },
        }
    }

    fn reader(root: &std::path::Path) -> ZarrGroupReader<FilesystemStore> {
        ZarrGroupReader::open(Arc::new(FilesystemStore::new(root).unwrap())).unwrap()
    }

    #[test]
    fn test_reads_fixture_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = CurrentsFixture::new([3, 4, 10, 12]);
        fixture.write(dir.path()).unwrap();

        let opened = reader(dir.path()).read_dataset(&request(&["uo", "vo"])).unwrap();
        let sizes = opened.dataset().sizes();
        assert_eq!(sizes["time"], 3);
        assert_eq!(sizes["depth"], 1);
        assert_eq!(sizes["latitude"], 10);
        assert_eq!(sizes["longitude"], 12);
        assert_eq!(opened.dataset().variables().len(), 2);
    }

    #[test]
    fn test_missing_store_metadata_is_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemStore::new(dir.path()).unwrap());
        let result = ZarrGroupReader::open(store);
        assert!(matches!(result, Err(TranscodeError::Provider(_))));
    }

    #[test]
    fn test_missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        CurrentsFixture::new([1, 4, 4, 4]).write(dir.path()).unwrap();

        let err = reader(dir.path()).read_dataset(&request(&["thetao"])).unwrap_err();
        assert!(matches!(err, TranscodeError::MissingVariable(ref v) if v == "thetao"));
    }

    #[test]
    fn test_short_coordinate_names_and_packed_values() {
        let dir = tempfile::tempdir().unwrap();
        let dims = ["time", "depth", "lat", "lon"];

        // Latitude stored with a zero fill value
        let mut lat = SourceArray::f32("lat", &["lat"], &[2], &[0.0, 1.0]);
        lat.fill = 0.0;

        SourceStore::new()
            .with_array(SourceArray::f64("time", &["time"], &[1], &[5.0]))
            .with_array(SourceArray::f32("depth", &["depth"], &[1], &[0.5]))
            .with_array(lat)
            .with_array(SourceArray::f32("lon", &["lon"], &[2], &[0.0, 1.0]))
            .with_array(
                SourceArray::i16("uo", &dims, &[1, 1, 2, 2], &[100, -32767, 0, 300], -32767)
                    .with_attr("scale_factor", serde_json::json!(0.01))
                    .with_attr("add_offset", serde_json::json!(1.0))
                    .with_attr("units", serde_json::json!("m s-1")),
            )
            .write(dir.path())
            .unwrap();

        let group = reader(dir.path());
        assert_eq!(group.find_coordinate(AxisRole::Latitude).unwrap().name, "lat");

        let opened = group.read_dataset(&request(&["uo"])).unwrap();
        let uo = &opened.dataset().variables()[0];
        assert_eq!(uo.dims(), ["time", "depth", "latitude", "longitude"]);
        assert_eq!(uo.attributes().get("units").unwrap(), "m s-1");
        assert!(uo.attributes().get("scale_factor").is_none());

        // latitude 0 survives the zero fill value
        let lat = opened.dataset().coordinate(AxisRole::Latitude).unwrap().values().unwrap();
        assert_eq!(lat, vec![0.0, 1.0]);

        let values = uo.materialize().unwrap().values;
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!(values[1].is_nan());
        assert!((values[2] - 1.0).abs() < 1e-9);
        assert!((values[3] - 4.0).abs() < 1e-9);
    }
    #[test]
    fn test_float32_land_fill_masked_before_averaging() {
        let dir = tempfile::tempdir().unwrap();
        let dims = ["time", "depth", "latitude", "longitude"];

        let mut uo = SourceArray::f32("uo", &dims, &[1, 1, 2, 2], &[1.0, 1e20, 3.0, 1e20])
            .with_attr("_FillValue", serde_json::json!(1e20));
        uo.fill = 1e20;

        SourceStore::new()
            .with_array(SourceArray::f64("time", &["time"], &[1], &[5.0]))
            .with_array(SourceArray::f32("depth", &["depth"], &[1], &[0.5]))
            .with_array(SourceArray::f32("latitude", &["latitude"], &[2], &[10.0, 11.0]))
            .with_array(SourceArray::f32("longitude", &["longitude"], &[2], &[20.0, 21.0]))
            .with_array(uo)
            .write(dir.path())
            .unwrap();

        let opened = reader(dir.path()).read_dataset(&request(&["uo"])).unwrap();
        let uo = opened.dataset().variables()[0].clone();

        let values = uo.materialize().unwrap().values;
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert!(values[3].is_nan());

        let mean = uo
            .coarsen("latitude", 2)
            .unwrap()
            .coarsen("longitude", 2)
            .unwrap()
            .materialize()
            .unwrap();
        assert_eq!(mean.values, vec![2.0]);
    }
}
