//! Exclusive claim on a destination directory.
//!
//! A lock file `<destination>.lock` is created with `create_new`, so only
//! one run can hold it. The file is removed when the guard is dropped. A
//! run that crashes leaves the file behind; it must be removed by hand.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TranscodeError};

/// Lock file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Guard holding a destination lock.
#[derive(Debug)]
pub struct DestinationLock {
    path: PathBuf,
}

impl DestinationLock {
    /// Path of the lock file guarding `destination`.
    pub fn lock_path(destination: &Path) -> PathBuf {
        let mut name = destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        destination.with_file_name(name)
    }

    /// Claim `destination`, failing if another run holds it.
    pub fn acquire(destination: &Path) -> Result<Self> {
        let path = Self::lock_path(destination);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TranscodeError::DestinationLocked(destination.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        file.write_all(serde_json::to_string(&info)?.as_bytes())?;
        debug!(lock = %path.display(), "Acquired destination lock");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "Failed to remove destination lock");
        }
    }
}
