//! Error types for gitsync-engine.

use std::path::PathBuf;

use thiserror::Error;

use gitsync_git::GitError;

/// Errors surfaced by the reconciler. Lower-layer failures are translated
/// at this boundary; nothing propagates raw to the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// True for failures that mean the repository cannot be processed at
    /// all (missing path, not a repository, unreadable, detached HEAD) —
    /// the configuration-error class, fatal for this repository only.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::Git(
                GitError::PathMissing { .. }
                    | GitError::NotARepository { .. }
                    | GitError::Unreadable { .. }
                    | GitError::DetachedHead { .. }
            )
        )
    }

    /// True for a rebase stopped by conflicting changes — operator-visible,
    /// higher severity than a plain connectivity error.
    pub fn is_rebase_conflict(&self) -> bool {
        matches!(self, EngineError::Git(GitError::RebaseConflict { .. }))
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}
