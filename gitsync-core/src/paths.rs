//! Well-known paths under `<home>/.gitsync/`.
//!
//! ```text
//! ~/.gitsync/
//!   config.yaml            (settings — mode 0600, created on first run)
//!   run/
//!     offline/
//!       <repo-key>.offline (connectivity marker; existence == offline)
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub const SETTINGS_FILE: &str = "config.yaml";

pub fn gitsync_root(home: &Path) -> PathBuf {
    home.join(".gitsync")
}

pub fn settings_path(home: &Path) -> PathBuf {
    gitsync_root(home).join(SETTINGS_FILE)
}

pub fn run_dir(home: &Path) -> PathBuf {
    gitsync_root(home).join("run")
}

pub fn offline_dir(home: &Path) -> PathBuf {
    run_dir(home).join("offline")
}

/// Stable filesystem-safe key for a repository path: the first 16 hex chars
/// of the SHA-256 of its canonical form. Falls back to the path as given
/// when canonicalization fails (e.g. the directory has been removed).
pub fn repo_key(repo_path: &Path) -> String {
    let canonical = std::fs::canonicalize(repo_path).unwrap_or_else(|_| repo_path.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// `<home>/.gitsync/run/offline/<repo-key>.offline`
pub fn offline_marker(home: &Path, repo_path: &Path) -> PathBuf {
    offline_dir(home).join(format!("{}.offline", repo_key(repo_path)))
}
