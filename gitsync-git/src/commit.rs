//! Staging and committing with the synthetic gitsync identity.

use std::path::Path;

use chrono::Utc;
use git2::{Commit, ErrorCode, Index, Signature};

use gitsync_core::{ChangeKind, ChangeSet, CommitRecord, WatchedRepo};

use crate::error::Result;
use crate::repo::open_inner;

/// Fixed author/committer identity for every commit gitsync creates.
pub(crate) fn synthetic_signature() -> Result<Signature<'static>> {
    Ok(Signature::now("gitsync", "root@localhost")?)
}

/// Apply a [`ChangeSet`] to the index: deleted paths are removed, new and
/// modified paths added, renames staged as remove(old) + add(new).
///
/// The working tree is re-checked per path: if a file recorded as added or
/// modified is gone by staging time, it is removed instead — the last
/// observed filesystem state wins.
pub fn stage_changes(repo: &WatchedRepo, changes: &ChangeSet) -> Result<()> {
    let git = open_inner(&repo.path)?;
    let mut index = git.index()?;
    let workdir = git.workdir().unwrap_or(&repo.path).to_path_buf();

    for (path, kind) in changes {
        match kind {
            ChangeKind::Deleted => {
                remove_if_present(&mut index, path)?;
            }
            ChangeKind::Renamed { from } => {
                remove_if_present(&mut index, from)?;
                add_current_state(&mut index, &workdir, path)?;
            }
            ChangeKind::Added | ChangeKind::Modified => {
                add_current_state(&mut index, &workdir, path)?;
            }
        }
    }
    index.write()?;
    Ok(())
}

fn add_current_state(index: &mut Index, workdir: &Path, path: &Path) -> Result<()> {
    if workdir.join(path).exists() {
        index.add_path(path)?;
        Ok(())
    } else {
        remove_if_present(index, path)
    }
}

fn remove_if_present(index: &mut Index, path: &Path) -> Result<()> {
    match index.remove_path(path) {
        Ok(()) => Ok(()),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Create one commit from the staged index on top of the current branch tip.
///
/// Returns `None` without committing when the staged tree is identical to
/// HEAD's tree — empty commits are never created.
pub fn commit_staged(repo: &WatchedRepo, message: &str) -> Result<Option<CommitRecord>> {
    let git = open_inner(&repo.path)?;
    let mut index = git.index()?;
    index.write()?;
    let tree_id = index.write_tree()?;

    let parent: Option<Commit> = match git.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(err) if err.code() == ErrorCode::UnbornBranch => None,
        Err(err) => return Err(err.into()),
    };

    let unchanged = match &parent {
        Some(parent) => parent.tree_id() == tree_id,
        None => git.find_tree(tree_id)?.is_empty(),
    };
    if unchanged {
        return Ok(None);
    }

    let tree = git.find_tree(tree_id)?;
    let sig = synthetic_signature()?;
    let parents: Vec<&Commit> = parent.iter().collect();
    let oid = git.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

    tracing::debug!(repo = %repo.path.display(), revision = %oid, "created commit");
    Ok(Some(CommitRecord {
        message: message.to_string(),
        revision: oid.to_string(),
        committed_at: Utc::now(),
    }))
}
