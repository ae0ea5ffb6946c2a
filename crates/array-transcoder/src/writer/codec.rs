//! Chunk compression.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde_json::{json, Value};

use crate::config::Compression;
use crate::error::{Result, TranscodeError};

/// Compressor applied to every chunk of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodec {
    compression: Compression,
    level: u32,
}

impl ChunkCodec {
    pub fn new(compression: Compression, level: u32) -> Self {
        Self {
            compression,
            level: level.clamp(1, 9),
        }
    }

    /// Codec for the `compressor` entry of a `.zarray` document.
    pub fn from_compressor(compressor: Option<&Value>) -> Result<Self> {
        let Some(compressor) = compressor.filter(|c| !c.is_null()) else {
            return Ok(Self::new(Compression::None, 1));
        };

        let id = compressor.get("id").and_then(Value::as_str).unwrap_or_default();
        let compression = match id {
            "zlib" => Compression::Zlib,
            "gzip" => Compression::Gzip,
            other => {
                return Err(TranscodeError::zarr(format!("unsupported compressor '{}'", other)));
            }
        };
        let level = compressor.get("level").and_then(Value::as_u64).unwrap_or(1);
        Ok(Self::new(compression, level as u32))
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// The `compressor` entry of a `.zarray` document.
    pub fn compressor_json(&self) -> Value {
        match self.compression {
            Compression::None => Value::Null,
            Compression::Zlib => json!({ "id": "zlib", "level": self.level }),
            Compression::Gzip => json!({ "id": "gzip", "level": self.level }),
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let level = flate2::Compression::new(self.level);
        let encoded = match self.compression {
            Compression::None => return Ok(bytes.to_vec()),
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(bytes)?;
                encoder.finish()?
            }
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(bytes)?;
                encoder.finish()?
            }
        };
        Ok(encoded)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self.compression {
            Compression::None => out.extend_from_slice(bytes),
            Compression::Zlib => {
                ZlibDecoder::new(bytes)
                    .read_to_end(&mut out)
                    .map_err(|e| TranscodeError::zarr(format!("zlib decode failed: {}", e)))?;
            }
            Compression::Gzip => {
                GzDecoder::new(bytes)
                    .read_to_end(&mut out)
                    .map_err(|e| TranscodeError::zarr(format!("gzip decode failed: {}", e)))?;
            }
        }
        Ok(out)
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(Compression::Zlib, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        (0..4096u32).flat_map(|v| ((v % 17) as f32).to_le_bytes()).collect()
    }

    #[test]
    fn test_zlib_compresses_and_restores() {
        let codec = ChunkCodec::default();
        let data = payload();
        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() < data.len());
        // zlib header
        assert_eq!(encoded[0], 0x78);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_gzip_header() {
        let codec = ChunkCodec::new(Compression::Gzip, 9);
        let encoded = codec.encode(&payload()).unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_compressor_json() {
        assert_eq!(
            ChunkCodec::new(Compression::Zlib, 5).compressor_json(),
            json!({"id": "zlib", "level": 5})
        );
        assert_eq!(ChunkCodec::new(Compression::None, 5).compressor_json(), Value::Null);
        assert_eq!(ChunkCodec::new(Compression::Zlib, 42).level(), 9);
    }

    #[test]
    fn test_from_compressor() {
        let zlib = json!({"id": "zlib", "level": 5});
        assert_eq!(ChunkCodec::from_compressor(Some(&zlib)).unwrap(), ChunkCodec::default());
        assert_eq!(
            ChunkCodec::from_compressor(Some(&json!({"id": "gzip", "level": 9}))).unwrap(),
            ChunkCodec::new(Compression::Gzip, 9)
        );
        assert_eq!(
            ChunkCodec::from_compressor(None).unwrap().compression(),
            Compression::None
        );
        assert_eq!(
            ChunkCodec::from_compressor(Some(&Value::Null)).unwrap().compression(),
            Compression::None
        );
        assert!(ChunkCodec::from_compressor(Some(&json!({"id": "blosc"}))).is_err());
    }
}
