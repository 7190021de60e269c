//! Domain types shared across the gitsync crates.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! `ChangeSet` paths are repository-relative; `WatchedRepo.path` is absolute.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// Classification of a single working-tree mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path is new (untracked or newly staged).
    Added,
    /// Tracked path whose content differs from the index.
    Modified,
    /// Tracked path missing from the working tree.
    Deleted,
    /// Path moved; `from` is the old repository-relative path.
    Renamed { from: PathBuf },
}

impl ChangeKind {
    /// Commit-message verb for this change ("Add file X" etc.).
    pub fn describe(&self, path: &Path) -> String {
        match self {
            ChangeKind::Added => format!("Add file {}", path.display()),
            ChangeKind::Modified => format!("Update file {}", path.display()),
            ChangeKind::Deleted => format!("Remove file {}", path.display()),
            ChangeKind::Renamed { from } => {
                format!("Move file from {} to {}", from.display(), path.display())
            }
        }
    }
}

/// An ordered set of path-level changes observed in one reconciliation cycle.
///
/// Invariants:
/// - a repository-relative path appears at most once;
/// - a rename is one [`ChangeKind::Renamed`] entry keyed by the destination
///   path, never a `Deleted` + `Added` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<PathBuf, ChangeKind>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &Path) -> Option<&ChangeKind> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, ChangeKind> {
        self.entries.iter()
    }

    /// Record one observed change, merging with anything already recorded for
    /// the path. Later observations win, with one exception: a `Modified`
    /// event never downgrades an earlier `Added` or `Renamed` — the path is
    /// still new to the repository as far as the next commit is concerned.
    pub fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        match (self.entries.get(&path), &kind) {
            (Some(ChangeKind::Added), ChangeKind::Modified) => {}
            (Some(ChangeKind::Renamed { .. }), ChangeKind::Modified) => {}
            _ => {
                self.entries.insert(path, kind);
            }
        }
    }

    /// Record a move as a single entry keyed by the destination path.
    /// Any change previously recorded for the source path is dropped.
    pub fn record_rename(&mut self, from: PathBuf, to: PathBuf) {
        self.entries.remove(&from);
        self.entries.insert(to, ChangeKind::Renamed { from });
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = (&'a PathBuf, &'a ChangeKind);
    type IntoIter = btree_map::Iter<'a, PathBuf, ChangeKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Repositories and commits
// ---------------------------------------------------------------------------

/// One local working directory bound to one remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedRepo {
    /// Absolute path to the working directory root.
    pub path: PathBuf,
    /// Short name of the branch HEAD points at (e.g. "master").
    pub branch: String,
    /// Configured remote, if any; `None` disables all network steps.
    pub remote: Option<String>,
}

/// Result of a local commit operation. Logged, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub message: String,
    /// Hex object id of the created commit.
    pub revision: String,
    pub committed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
