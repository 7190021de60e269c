//! gitsync core library — domain types, settings persistence, path layout.
//!
//! Public API surface:
//! - [`types`] — [`ChangeSet`], [`ChangeKind`], [`CommitRecord`], [`WatchedRepo`]
//! - [`settings`] — load / save / first-run init, [`Config`]
//! - [`paths`] — `~/.gitsync/` layout and offline marker keys
//! - [`error`] — [`SettingsError`]

pub mod error;
pub mod paths;
pub mod settings;
pub mod types;

pub use error::SettingsError;
pub use settings::{Config, Settings};
pub use types::{ChangeKind, ChangeSet, CommitRecord, WatchedRepo};
