//! Local store writing and reading.

mod codec;
mod zarr_v2;

pub use codec::ChunkCodec;
pub use zarr_v2::ZarrV2Store;

use std::collections::BTreeMap;
use std::path::PathBuf;

use ocean_common::AxisRole;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cf::ARRAY_DIMENSIONS;
use crate::config::Precision;
use crate::error::Result;
use crate::lazy::MaterializedArray;
use crate::metadata::ZarrayV2;

/// Role of an array within the output group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Coordinate(AxisRole),
    Variable,
}

/// A materialized array with its chunk layout and compressor attached.
#[derive(Debug, Clone)]
pub struct EncodedArray {
    pub array: MaterializedArray,
    pub chunks: Vec<u64>,
    pub codec: ChunkCodec,
    pub kind: ArrayKind,
}

impl EncodedArray {
    pub fn name(&self) -> &str {
        &self.array.name
    }

    /// The `.zarray` document for this array.
    pub fn zarray(&self) -> ZarrayV2 {
        ZarrayV2 {
            shape: self.array.shape.clone(),
            chunks: self.chunks.clone(),
            dtype: self.array.precision.zarr_dtype().to_string(),
            fill_value: json!("NaN"),
            compressor: match self.codec.compressor_json() {
                Value::Null => None,
                compressor => Some(compressor),
            },
            filters: None,
            order: "C".to_string(),
            zarr_format: 2,
            dimension_separator: Some(".".to_string()),
        }
    }

    /// The `.zattrs` document: descriptive attributes plus dimension names.
    pub fn zattrs(&self) -> Map<String, Value> {
        let mut attrs = self.array.attributes.clone();
        attrs.insert(ARRAY_DIMENSIONS.to_string(), json!(self.array.dims));
        attrs
    }

    /// Number of chunks along each axis.
    pub fn chunk_grid(&self) -> Vec<u64> {
        self.array
            .shape
            .iter()
            .zip(&self.chunks)
            .map(|(&n, &c)| n.div_ceil(c.max(1)))
            .collect()
    }

    /// Uncompressed bytes of one chunk: full chunk shape, little-endian,
    /// C order, cells past the array edge filled with NaN.
    pub fn chunk_bytes(&self, chunk_index: &[u64]) -> Vec<u8> {
        let ndim = self.chunks.len();
        let chunk_len: u64 = self.chunks.iter().product();
        let element_size = self.array.precision.element_size();
        let mut out = Vec::with_capacity(chunk_len as usize * element_size);
        let mut local = vec![0u64; ndim];

        for _ in 0..chunk_len {
            let mut flat = 0u64;
            let mut inside = true;
            for axis in 0..ndim {
                let global = chunk_index[axis] * self.chunks[axis] + local[axis];
                if global >= self.array.shape[axis] {
                    inside = false;
                    break;
                }
                flat = flat * self.array.shape[axis] + global;
            }

            let value = if inside {
                self.array.values[flat as usize]
            } else {
                f64::NAN
            };
            match self.array.precision {
                Precision::Float32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
                Precision::Float64 => out.extend_from_slice(&value.to_le_bytes()),
            }

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
}

/// One array as found in a written store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArray {
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub dims: Vec<String>,
    pub dtype: String,
}

/// What a reader finds in a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub path: PathBuf,
    /// Sum of the sizes of every file under the store root.
    pub total_bytes: u64,
    pub arrays: BTreeMap<String, StoredArray>,
}

/// Destination of encoded arrays.
pub trait StoreWriter {
    /// Remove any previous store and leave an empty root.
    fn reset(&self) -> Result<()>;

    /// Write all arrays, group attributes and consolidated metadata.
    /// Returns the number of bytes written.
    fn write(&self, arrays: &[EncodedArray], attributes: &Map<String, Value>) -> Result<u64>;
}

/// Read-only access to a written store.
pub trait StoreReader {
    fn open(&self) -> Result<StoreSnapshot>;
}
