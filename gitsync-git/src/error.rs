use std::path::PathBuf;

use thiserror::Error;

/// Error surface for repository operations, with the open failures split
/// into distinct kinds so callers can tell a missing path from a directory
/// that simply is not a repository.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("working directory does not exist: {path}")]
    PathMissing { path: PathBuf },

    #[error("not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("cannot read repository at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("repository at {path} has a detached HEAD; a checked-out branch is required")]
    DetachedHead { path: PathBuf },

    #[error("rebase halted by conflicts in {path}; working tree restored, resolve manually")]
    RebaseConflict { path: PathBuf },

    #[error("{context} failed: {source}")]
    Network {
        context: String,
        #[source]
        source: git2::Error,
    },

    #[error("push rejected for {refname}: {reason}")]
    PushRejected { refname: String, reason: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GitError>;
