//! Connectivity gate — a file-backed offline flag, one per repository.
//!
//! The flag must survive process restarts (outages routinely outlive the
//! daemon), so it is a marker file rather than an in-memory bool. Its mere
//! existence is the state; the content is meaningless.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gitsync_core::paths::offline_marker;

use crate::error::{io_err, EngineError};

#[derive(Debug, Clone)]
pub struct ConnectivityGate {
    marker: PathBuf,
}

impl ConnectivityGate {
    pub fn new(home: &Path, repo_path: &Path) -> Self {
        Self {
            marker: offline_marker(home, repo_path),
        }
    }

    /// True iff the persisted marker exists.
    pub fn is_offline(&self) -> bool {
        self.marker.exists()
    }

    /// Idempotently create the marker. Returns whether the state actually
    /// transitioned, so the caller can warn once instead of every cycle.
    ///
    /// Only call after a verified fetch failure.
    pub fn mark_offline(&self) -> Result<bool, EngineError> {
        if self.marker.exists() {
            return Ok(false);
        }
        if let Some(dir) = self.marker.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        fs::write(&self.marker, b"").map_err(|e| io_err(&self.marker, e))?;
        Ok(true)
    }

    /// Idempotently remove the marker. Returns whether the state actually
    /// transitioned. Only call after a network operation succeeded.
    pub fn mark_online(&self) -> Result<bool, EngineError> {
        match fs::remove_file(&self.marker) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_err(&self.marker, err)),
        }
    }
}
