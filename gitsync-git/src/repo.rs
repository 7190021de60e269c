//! Opening a watched repository.
//!
//! git2 handles are not `Send`, so no handle is ever held across an await
//! point: [`open`] captures the stable facts (path, branch, remote) into a
//! [`WatchedRepo`] and every operation in this crate re-opens the
//! repository from that path.

use std::path::Path;

use git2::{ErrorCode, Repository};

use gitsync_core::WatchedRepo;

use crate::error::{GitError, Result};

/// Open `path` as a watched repository, classifying failures.
///
/// Distinguishes "path missing" from "not a repository" from "unreadable",
/// rather than collapsing them into one catch-all.
pub fn open(path: &Path) -> Result<WatchedRepo> {
    let git = open_inner(path)?;
    let branch = current_branch(&git, path)?;
    let remote = preferred_remote(&git);
    Ok(WatchedRepo {
        path: path.to_path_buf(),
        branch,
        remote,
    })
}

/// Re-open the underlying git2 repository for one operation.
pub(crate) fn open_inner(path: &Path) -> Result<Repository> {
    if !path.exists() {
        return Err(GitError::PathMissing {
            path: path.to_path_buf(),
        });
    }
    match Repository::open(path) {
        Ok(git) => Ok(git),
        Err(err) if err.code() == ErrorCode::NotFound => Err(GitError::NotARepository {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(GitError::Unreadable {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Short name of the branch HEAD points at, also for unborn branches.
fn current_branch(git: &Repository, path: &Path) -> Result<String> {
    match git.head() {
        Ok(head) => match head.shorthand() {
            Some(name) if name != "HEAD" => Ok(name.to_string()),
            _ => Err(GitError::DetachedHead {
                path: path.to_path_buf(),
            }),
        },
        Err(err) if err.code() == ErrorCode::UnbornBranch => {
            let head = git.find_reference("HEAD")?;
            match head.symbolic_target().and_then(|t| t.strip_prefix("refs/heads/")) {
                Some(name) => Ok(name.to_string()),
                None => Err(GitError::DetachedHead {
                    path: path.to_path_buf(),
                }),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// The remote to sync against: "origin" when present, else the first
/// configured remote, else `None` (local-only repository).
fn preferred_remote(git: &Repository) -> Option<String> {
    let remotes = git.remotes().ok()?;
    if remotes.iter().flatten().any(|name| name == "origin") {
        return Some("origin".to_string());
    }
    remotes.iter().flatten().next().map(str::to_string)
}
