//! Post-write verification.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TranscodeError};
use crate::writer::{StoreSnapshot, StoredArray};

/// A store that was reopened and matched what was encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalStore {
    pub path: PathBuf,
    pub total_bytes: u64,
    pub arrays: BTreeMap<String, StoredArray>,
}

impl LocalStore {
    pub fn array_names(&self) -> Vec<&str> {
        self.arrays.keys().map(String::as_str).collect()
    }
}

/// Compare a reopened store with the encoded layout.
///
/// # Arguments
/// * `snapshot` - What the reader found
/// * `expected_names` - Array names the store must contain, no more and no fewer
/// * `encoded` - Shape and chunk shape per written array
/// * `max_store_bytes` - Optional size budget
pub fn verify_store(
    snapshot: StoreSnapshot,
    expected_names: &[String],
    encoded: &BTreeMap<String, (Vec<u64>, Vec<u64>)>,
    max_store_bytes: Option<u64>,
) -> Result<LocalStore> {
    let found: BTreeSet<&str> = snapshot.arrays.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = expected_names.iter().map(String::as_str).collect();

    if found != expected {
        let missing: Vec<&str> = expected.difference(&found).copied().collect();
        let unexpected: Vec<&str> = found.difference(&expected).copied().collect();
        warn!(?missing, ?unexpected, "Array set mismatch");
        return Err(TranscodeError::verification(format!(
            "array set mismatch: missing {:?}, unexpected {:?}",
            missing, unexpected
        )));
    }

    for (name, (shape, chunks)) in encoded {
        let stored = snapshot.arrays.get(name).ok_or_else(|| {
            TranscodeError::verification(format!("encoded array '{}' not found in store", name))
        })?;

        if &stored.shape != shape {
            return Err(TranscodeError::verification(format!(
                "'{}' has shape {:?}, expected {:?}",
                name, stored.shape, shape
            )));
        }

        if &stored.chunks != chunks {
            return Err(TranscodeError::verification(format!(
                "'{}' has chunks {:?}, expected {:?}",
                name, stored.chunks, chunks
            )));
        }
    }

    if snapshot.total_bytes == 0 {
        return Err(TranscodeError::verification("store is empty"));
    }

    if let Some(limit) = max_store_bytes {
        if snapshot.total_bytes > limit {
            return Err(TranscodeError::verification(format!(
                "store is {} bytes, over the {} byte budget",
                snapshot.total_bytes, limit
            )));
        }
    }

    info!(
        path = %snapshot.path.display(),
        total_bytes = snapshot.total_bytes,
        megabytes = %format!("{:.2}", snapshot.total_bytes as f64 / 1e6),
        arrays = ?found,
        "Verified store"
    );

    Ok(LocalStore {
        path: snapshot.path,
        total_bytes: snapshot.total_bytes,
        arrays: snapshot.arrays,
    })
}
