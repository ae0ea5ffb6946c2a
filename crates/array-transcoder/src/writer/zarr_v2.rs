//! Zarr v2 directory store with consolidated metadata.
//!
//! Layout written:
//!
//! ```text
//! <root>/.zgroup
//! <root>/.zattrs
//! <root>/.zmetadata
//! <root>/<array>/.zarray
//! <root>/<array>/.zattrs
//! <root>/<array>/<i>.<j>.<k>...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{ChunkCodec, EncodedArray, StoreReader, StoreSnapshot, StoreWriter, StoredArray};
use crate::error::{Result, TranscodeError};
use crate::metadata::{ConsolidatedMetadata, ZarrayV2, CONSOLIDATED_FORMAT, ZMETADATA};

/// A Zarr v2 group on the local filesystem.
#[derive(Debug, Clone)]
pub struct ZarrV2Store {
    root: PathBuf,
}

impl ZarrV2Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sum of the sizes of every file under the root.
    pub fn total_bytes(&self) -> Result<u64> {
        let mut total = 0u64;
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| TranscodeError::storage(e.to_string()))?;
            if entry.file_type().is_file() {
                total += entry
                    .metadata()
                    .map_err(|e| TranscodeError::storage(e.to_string()))?
                    .len();
            }
        }
        Ok(total)
    }

    /// The `.zarray` document of `name`, read from the array directory.
    pub fn read_zarray(&self, name: &str) -> Result<ZarrayV2> {
        let path = self.root.join(name).join(".zarray");
        let bytes = fs::read(&path).map_err(|e| {
            TranscodeError::verification(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TranscodeError::verification(format!("invalid .zarray for '{}': {}", name, e)))
    }

    /// Decode every chunk of `name` and assemble the array in C order.
    pub fn read_values(&self, name: &str) -> Result<Vec<f64>> {
        let zarray = self.read_zarray(name)?;
        let codec = ChunkCodec::from_compressor(zarray.compressor.as_ref())?;
        let element_size = match zarray.dtype.as_str() {
            "<f4" => 4,
            "<f8" => 8,
            other => {
                return Err(TranscodeError::verification(format!(
                    "'{}' has unsupported dtype {}",
                    name, other
                )));
            }
        };

        let shape = &zarray.shape;
        let chunks = &zarray.chunks;
        if chunks.len() != shape.len() || chunks.contains(&0) {
            return Err(TranscodeError::verification(format!(
                "'{}' has chunks {:?} for shape {:?}",
                name, chunks, shape
            )));
        }

        let grid: Vec<u64> = shape.iter().zip(chunks).map(|(&n, &c)| n.div_ceil(c)).collect();
        let chunk_len: u64 = chunks.iter().product();
        let mut values = vec![f64::NAN; shape.iter().product::<u64>() as usize];
        let dir = self.root.join(name);

        for index in chunk_indices(&grid) {
            let key = chunk_key(&index);
            let raw = fs::read(dir.join(&key)).map_err(|e| {
                TranscodeError::verification(format!("'{}' chunk {} unreadable: {}", name, key, e))
            })?;
            let bytes = codec.decode(&raw)?;
            if bytes.len() as u64 != chunk_len * element_size {
                return Err(TranscodeError::verification(format!(
                    "'{}' chunk {} decodes to {} bytes, expected {}",
                    name,
                    key,
                    bytes.len(),
                    chunk_len * element_size
                )));
            }

            for (local, element) in chunk_indices(chunks).zip(bytes.chunks_exact(element_size as usize)) {
                let mut flat = 0u64;
                let mut inside = true;
                for axis in 0..shape.len() {
                    let global = index[axis] * chunks[axis] + local[axis];
                    if global >= shape[axis] {
                        inside = false;
                        break;
                    }
                    flat = flat * shape[axis] + global;
                }
                if !inside {
                    continue;
                }
                values[flat as usize] = match element_size {
                    4 => f32::from_le_bytes([element[0], element[1], element[2], element[3]]) as f64,
                    _ => f64::from_le_bytes([
                        element[0], element[1], element[2], element[3], element[4], element[5],
                        element[6], element[7],
                    ]),
                };
            }
        }

        Ok(values)
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<u64> {
        let text = serde_json::to_string_pretty(value)?;
        fs::write(path, &text)?;
        Ok(text.len() as u64)
    }

    fn write_array(&self, array: &EncodedArray) -> Result<u64> {
        let dir = self.root.join(array.name());
        fs::create_dir_all(&dir)?;

        let mut written = self.write_json(&dir.join(".zarray"), &serde_json::to_value(array.zarray())?)?;
        written += self.write_json(&dir.join(".zattrs"), &Value::Object(array.zattrs()))?;

        let grid = array.chunk_grid();
        let total: u64 = grid.iter().product();

        for index in chunk_indices(&grid) {
            let encoded = array.codec.encode(&array.chunk_bytes(&index))?;
            fs::write(dir.join(chunk_key(&index)), &encoded)?;
            written += encoded.len() as u64;
        }

        debug!(
            array = %array.name(),
            shape = ?array.array.shape,
            chunks = ?array.chunks,
            chunk_count = total,
            bytes = written,
            "Wrote array"
        );
        Ok(written)
    }
}

impl StoreWriter for ZarrV2Store {
    fn reset(&self) -> Result<()> {
        if self.root.exists() {
            info!(path = %self.root.display(), "Removing previous store");
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn write(&self, arrays: &[EncodedArray], attributes: &Map<String, Value>) -> Result<u64> {
        fs::create_dir_all(&self.root)?;

        let zgroup = json!({ "zarr_format": 2 });
        let zattrs = Value::Object(attributes.clone());
        let mut written = self.write_json(&self.root.join(".zgroup"), &zgroup)?;
        written += self.write_json(&self.root.join(".zattrs"), &zattrs)?;

        let mut metadata = Map::new();
        metadata.insert(".zgroup".to_string(), zgroup);
        metadata.insert(".zattrs".to_string(), zattrs);

        for array in arrays {
            written += self.write_array(array)?;
            metadata.insert(
                format!("{}/.zarray", array.name()),
                serde_json::to_value(array.zarray())?,
            );
            metadata.insert(
                format!("{}/.zattrs", array.name()),
                Value::Object(array.zattrs()),
            );
        }

        written += self.write_json(
            &self.root.join(ZMETADATA),
            &json!({
                "metadata": metadata,
                "zarr_consolidated_format": CONSOLIDATED_FORMAT,
            }),
        )?;

        info!(
            path = %self.root.display(),
            arrays = arrays.len(),
            bytes = written,
            "Wrote Zarr v2 store"
        );
        Ok(written)
    }
}

impl StoreReader for ZarrV2Store {
    /// Open through consolidated metadata, check each array's own
    /// `.zarray` against its consolidated entry, then decode every chunk.
    fn open(&self) -> Result<StoreSnapshot> {
        let bytes = fs::read(self.root.join(ZMETADATA)).map_err(|e| {
            TranscodeError::verification(format!(
                "cannot read consolidated metadata in {}: {}",
                self.root.display(),
                e
            ))
        })?;
        let consolidated = ConsolidatedMetadata::parse(&bytes)?;

        let mut arrays = BTreeMap::new();
        for (name, entry) in &consolidated.arrays {
            let zarray = self.read_zarray(name)?;
            if zarray != entry.zarray {
                return Err(TranscodeError::verification(format!(
                    "'{}' .zarray differs from consolidated metadata (chunks {:?} vs {:?})",
                    name, zarray.chunks, entry.zarray.chunks
                )));
            }

            self.read_values(name).map_err(|e| match e {
                TranscodeError::Verification(_) => e,
                other => TranscodeError::verification(format!("'{}' unreadable: {}", name, other)),
            })?;

            arrays.insert(
                name.clone(),
                StoredArray {
                    shape: entry.zarray.shape.clone(),
                    chunks: entry.zarray.chunks.clone(),
                    dims: entry.dims.clone(),
                    dtype: entry.zarray.dtype.clone(),
                },
            );
        }

        Ok(StoreSnapshot {
            path: self.root.clone(),
            total_bytes: self.total_bytes()?,
            arrays,
        })
    }
}

/// Chunk key for a chunk grid index: `i.j.k`.
fn chunk_key(index: &[u64]) -> String {
    index
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Every index of a grid in C order.
fn chunk_indices(grid: &[u64]) -> impl Iterator<Item = Vec<u64>> + '_ {
    let total: u64 = grid.iter().product();
    let mut index = vec![0u64; grid.len()];
    (0..total).map(move |_| {
        let current = index.clone();
        for axis in (0..grid.len()).rev() {
            index[axis] += 1;
            if index[axis] < grid[axis] {
                break;
            }
            index[axis] = 0;
        }
        current
    })
}
