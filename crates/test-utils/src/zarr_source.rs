//! Raw Zarr v2 source stores for tests.
//!
//! Writes uncompressed, little-endian, C-order arrays with consolidated
//! metadata, the layout the remote ARCO stores use. Kept independent of
//! the workspace's own writer so tests can check one against the other.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::fixtures::MODEL_DEPTHS;
use crate::generators::{create_current_field, linspace};

/// Element types a source store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDtype {
    F32,
    F64,
    I16,
}

impl SourceDtype {
    fn zarr_dtype(self) -> &'static str {
        match self {
            SourceDtype::F32 => "<f4",
            SourceDtype::F64 => "<f8",
            SourceDtype::I16 => "<i2",
        }
    }

    fn encode(self, value: f64, out: &mut Vec<u8>) {
        match self {
            SourceDtype::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
            SourceDtype::F64 => out.extend_from_slice(&value.to_le_bytes()),
            SourceDtype::I16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
        }
    }
}

/// One array of a source store.
#[derive(Debug, Clone)]
pub struct SourceArray {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub dtype: SourceDtype,
    /// Stored values in C order (raw integers for integer arrays).
    pub values: Vec<f64>,
    /// Fill used for chunk padding and recorded in `.zarray`.
    pub fill: f64,
    pub attrs: Map<String, Value>,
}

impl SourceArray {
    fn new(name: &str, dims: &[&str], shape: &[usize], dtype: SourceDtype, values: Vec<f64>) -> Self {
        assert_eq!(dims.len(), shape.len(), "one dimension name per axis");
        assert_eq!(
            values.len(),
            shape.iter().product::<usize>(),
            "value count must match shape"
        );
        Self {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            chunks: shape.iter().map(|&s| s.max(1)).collect(),
            dtype,
            values,
            fill: f64::NAN,
            attrs: Map::new(),
        }
    }

    pub fn f32(name: &str, dims: &[&str], shape: &[usize], values: &[f32]) -> Self {
        let values = values.iter().map(|&v| v as f64).collect();
        Self::new(name, dims, shape, SourceDtype::F32, values)
    }

    pub fn f64(name: &str, dims: &[&str], shape: &[usize], values: &[f64]) -> Self {
        Self::new(name, dims, shape, SourceDtype::F64, values.to_vec())
    }

    /// Packed integer array; `fill` marks missing cells.
    pub fn i16(name: &str, dims: &[&str], shape: &[usize], values: &[i16], fill: i16) -> Self {
        let values = values.iter().map(|&v| v as f64).collect();
        let mut array = Self::new(name, dims, shape, SourceDtype::I16, values);
        array.fill = fill as f64;
        array
    }

    pub fn with_chunks(mut self, chunks: &[usize]) -> Self {
        assert_eq!(chunks.len(), self.shape.len());
        self.chunks = chunks.iter().map(|&c| c.max(1)).collect();
        self
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    fn zarray(&self) -> Value {
        let fill_value = match self.dtype {
            SourceDtype::I16 => json!(self.fill as i64),
            _ if self.fill.is_nan() => json!("NaN"),
            _ => json!(self.fill),
        };
        json!({
            "chunks": self.chunks,
            "compressor": null,
            "dtype": self.dtype.zarr_dtype(),
            "fill_value": fill_value,
            "filters": null,
            "order": "C",
            "shape": self.shape,
            "zarr_format": 2,
        })
    }

    fn zattrs(&self) -> Value {
        let mut attrs = self.attrs.clone();
        attrs.insert("_ARRAY_DIMENSIONS".to_string(), json!(self.dims));
        Value::Object(attrs)
    }

    fn chunk_grid(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&s, &c)| s.div_ceil(c))
            .collect()
    }

    /// Encode one full-size chunk, padding past the array edge with fill.
    fn encode_chunk(&self, chunk_index: &[usize]) -> Vec<u8> {
        let ndim = self.shape.len();
        let chunk_len: usize = self.chunks.iter().product();
        let mut out = Vec::with_capacity(chunk_len * 8);
        let mut local = vec![0usize; ndim];

        for _ in 0..chunk_len {
            let mut flat = 0usize;
            let mut inside = true;
            for axis in 0..ndim {
                let global = chunk_index[axis] * self.chunks[axis] + local[axis];
                if global >= self.shape[axis] {
                    inside = false;
                    break;
                }
                flat = flat * self.shape[axis] + global;
            }
            let value = if inside { self.values[flat] } else { self.fill };
            self.dtype.encode(value, &mut out);

            for axis in (0..ndim).rev() {
                local[axis] += 1;
                if local[axis] < self.chunks[axis] {
                    break;
                }
                local[axis] = 0;
            }
        }
        out
    }

    fn write(&self, root: &Path) -> io::Result<()> {
        let dir = root.join(&self.name);
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(".zarray"), &self.zarray())?;
        write_json(&dir.join(".zattrs"), &self.zattrs())?;

        let grid = self.chunk_grid();
        let total: usize = grid.iter().product();
        let mut index = vec![0usize; grid.len()];
        for _ in 0..total {
            let key = index
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(".");
            fs::write(dir.join(key), self.encode_chunk(&index))?;

            for axis in (0..grid.len()).rev() {
                index[axis] += 1;
                if index[axis] < grid[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(())
    }
}

/// A Zarr v2 group of arrays with consolidated metadata.
#[derive(Debug, Clone, Default)]
pub struct SourceStore {
    pub arrays: Vec<SourceArray>,
    pub attrs: Map<String, Value>,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_array(mut self, array: SourceArray) -> Self {
        self.arrays.push(array);
        self
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    /// Write the store under `root`, creating the directory.
    pub fn write(&self, root: &Path) -> io::Result<()> {
        fs::create_dir_all(root)?;
        let zgroup = json!({ "zarr_format": 2 });
        let zattrs = Value::Object(self.attrs.clone());
        write_json(&root.join(".zgroup"), &zgroup)?;
        write_json(&root.join(".zattrs"), &zattrs)?;

        let mut metadata = Map::new();
        metadata.insert(".zgroup".to_string(), zgroup);
        metadata.insert(".zattrs".to_string(), zattrs);
        for array in &self.arrays {
            array.write(root)?;
            metadata.insert(format!("{}/.zarray", array.name), array.zarray());
            metadata.insert(format!("{}/.zattrs", array.name), array.zattrs());
        }

        write_json(
            &root.join(".zmetadata"),
            &json!({ "metadata": metadata, "zarr_consolidated_format": 1 }),
        )
    }
}

fn write_json(path: &Path, value: &Value) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, text)
}

/// Synthetic currents dataset with known values.
///
/// Coordinates are stored the way the upstream stores do: `time` as f64
/// hours, `depth`/`latitude`/`longitude` as f32. The `*_f64` vectors hold
/// the values exactly as a reader sees them after the f32 round trip.
#[derive(Debug, Clone)]
pub struct CurrentsFixture {
    /// `[time, depth, latitude, longitude]`
    pub shape: [usize; 4],
    pub times: Vec<f64>,
    pub depths: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub uo: Vec<f32>,
    pub vo: Vec<f32>,
    /// Chunk shape of the data variables in the source store.
    pub chunks: [usize; 4],
}

impl CurrentsFixture {
    /// Build a fixture on a 1/12° grid starting at (-80°, -180°).
    pub fn new(shape: [usize; 4]) -> Self {
        let [nt, nd, ny, nx] = shape;
        let round = |v: f64| (v as f32) as f64;

        let times = (0..nt).map(|t| 648_000.0 + 6.0 * t as f64).collect();
        let depths = (0..nd)
            .map(|d| round(MODEL_DEPTHS.get(d).copied().unwrap_or(1.2 * d as f64)))
            .collect();
        let step = 1.0 / 12.0;
        let latitudes = linspace(-80.0, -80.0 + step * ny.saturating_sub(1) as f64, ny)
            .into_iter()
            .map(round)
            .collect();
        let longitudes = linspace(-180.0, -180.0 + step * nx.saturating_sub(1) as f64, nx)
            .into_iter()
            .map(round)
            .collect();

        Self {
            shape,
            times,
            depths,
            latitudes,
            longitudes,
            uo: create_current_field(shape, 0.0),
            vo: create_current_field(shape, 100.0),
            chunks: [1, 1, ny.clamp(1, 7), nx.clamp(1, 9)],
        }
    }

    /// Use different source chunks for the data variables.
    pub fn with_chunks(mut self, chunks: [usize; 4]) -> Self {
        self.chunks = chunks;
        self
    }

    /// Flat C-order index of a grid point.
    pub fn index(&self, t: usize, d: usize, y: usize, x: usize) -> usize {
        let [_, nd, ny, nx] = self.shape;
        ((t * nd + d) * ny + y) * nx + x
    }

    /// Index of the latest time step.
    pub fn latest_time(&self) -> usize {
        self.times
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn store(&self) -> SourceStore {
        let [nt, nd, ny, nx] = self.shape;
        let dims = ["time", "depth", "latitude", "longitude"];
        let to_f32 = |values: &[f64]| values.iter().map(|&v| v as f32).collect::<Vec<_>>();

        SourceStore::new()
            .with_attr("title", json!("synthetic surface currents"))
            .with_attr("Conventions", json!("CF-1.8"))
            .with_array(
                SourceArray::f64("time", &["time"], &[nt], &self.times)
                    .with_attr("units", json!("hours since 1950-01-01"))
                    .with_attr("calendar", json!("gregorian"))
                    .with_attr("standard_name", json!("time")),
            )
            .with_array(
                SourceArray::f32("depth", &["depth"], &[nd], &to_f32(&self.depths))
                    .with_attr("units", json!("m"))
                    .with_attr("positive", json!("down")),
            )
            .with_array(
                SourceArray::f32("latitude", &["latitude"], &[ny], &to_f32(&self.latitudes))
                    .with_attr("units", json!("degrees_north"))
                    .with_attr("standard_name", json!("latitude")),
            )
            .with_array(
                SourceArray::f32("longitude", &["longitude"], &[nx], &to_f32(&self.longitudes))
                    .with_attr("units", json!("degrees_east"))
                    .with_attr("standard_name", json!("longitude")),
            )
            .with_array(
                SourceArray::f32("uo", &dims, &self.shape, &self.uo)
                    .with_chunks(&self.chunks)
                    .with_attr("standard_name", json!("eastward_sea_water_velocity"))
                    .with_attr("units", json!("m s-1"))
                    .with_attr("long_name", json!("Eastward velocity")),
            )
            .with_array(
                SourceArray::f32("vo", &dims, &self.shape, &self.vo)
                    .with_chunks(&self.chunks)
                    .with_attr("standard_name", json!("northward_sea_water_velocity"))
                    .with_attr("units", json!("m s-1"))
                    .with_attr("long_name", json!("Northward velocity")),
            )
    }

    /// Write the fixture store under `root`.
    pub fn write(&self, root: &Path) -> io::Result<()> {
        self.store().write(root)
    }
}
