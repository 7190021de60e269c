//! Settings file: `<home>/.gitsync/config.yaml`.
//!
//! A flat key/value document:
//!
//! ```yaml
//! work_dir: "~/notes, ~/wiki"
//! debounce_secs: 10
//! ```
//!
//! `work_dir` is a comma-separated list of repository paths; `~` is expanded
//! against the caller's home. On first run the file is created with empty
//! defaults and persisted back.
//!
//! # API pattern
//!
//! Every function takes an explicit path or home (`_at` style) so tests can
//! run against a `TempDir`; the CLI resolves home via `dirs::home_dir()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, SettingsError};
use crate::paths::settings_path;

pub const DEFAULT_DEBOUNCE_SECS: u64 = 10;

fn default_debounce_secs() -> u64 {
    DEFAULT_DEBOUNCE_SECS
}

/// On-disk settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Comma-separated repository paths.
    #[serde(default)]
    pub work_dir: String,

    /// Quiet period for the commit batcher, in seconds.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_dir: String::new(),
            debounce_secs: DEFAULT_DEBOUNCE_SECS,
        }
    }
}

impl Settings {
    /// Split `work_dir` on commas, trim whitespace, drop empty entries, and
    /// expand a leading `~` against `home`.
    pub fn repositories(&self, home: &Path) -> Vec<PathBuf> {
        self.work_dir
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| expand_home(entry, home))
            .collect()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }
}

/// Process-lifetime configuration: settings plus the CLI mode flag.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub repositories: Vec<PathBuf>,
    pub daemon: bool,
    pub debounce: Duration,
}

impl Config {
    pub fn from_settings(settings: &Settings, home: &Path, daemon: bool) -> Self {
        Self {
            repositories: settings.repositories(home),
            daemon,
            debounce: settings.debounce(),
        }
    }
}

fn expand_home(entry: &str, home: &Path) -> PathBuf {
    if entry == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = entry.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(entry)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load settings from `path`; on first run, create the file with defaults
/// and persist it back so the operator has something to edit.
pub fn load_or_init(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        let settings = Settings::default();
        save(path, &settings)?;
        return Ok(settings);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| SettingsError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `load_or_init` against the default location under `home`.
pub fn load_or_init_at(home: &Path) -> Result<Settings, SettingsError> {
    load_or_init(&settings_path(home))
}

/// `load_or_init_at` convenience wrapper — uses `dirs::home_dir()`.
/// Tests must never call this; always use the explicit-path forms.
pub fn load_or_init_default() -> Result<Settings, SettingsError> {
    let home = dirs::home_dir().ok_or(SettingsError::HomeNotFound)?;
    load_or_init_at(&home)
}

/// Atomically save settings to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
