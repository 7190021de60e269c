//! Stash handling around the pre-sync fetch/rebase.

use gitsync_core::WatchedRepo;

use git2::ErrorCode;

use crate::commit::synthetic_signature;
use crate::error::Result;
use crate::repo::open_inner;

/// Stash uncommitted tracked modifications so rebase runs against a clean
/// tree. Returns whether anything was actually stashed; a clean tree (or
/// one that is only untracked files) stashes nothing.
pub fn save_if_dirty(repo: &WatchedRepo) -> Result<bool> {
    let mut git = open_inner(&repo.path)?;
    let sig = synthetic_signature()?;
    match git.stash_save(&sig, "gitsync pre-sync", None) {
        Ok(oid) => {
            tracing::debug!(repo = %repo.path.display(), stash = %oid, "stashed local modifications");
            Ok(true)
        }
        Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Restore the most recent gitsync stash. Tolerates an empty stash stack so
/// callers can pair it unconditionally with [`save_if_dirty`].
pub fn pop(repo: &WatchedRepo) -> Result<()> {
    let mut git = open_inner(&repo.path)?;
    match git.stash_pop(0, None) {
        Ok(()) => Ok(()),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::testutil::{commit_all, init_repo};

    #[test]
    fn stash_roundtrip_restores_modifications() {
        let dir = TempDir::new().expect("dir");
        init_repo(dir.path());
        fs::write(dir.path().join("a.txt"), "v1\n").unwrap();
        commit_all(dir.path(), "seed");
        fs::write(dir.path().join("a.txt"), "v2\n").unwrap();

        let repo = crate::repo::open(dir.path()).expect("open");
        assert!(save_if_dirty(&repo).expect("stash"));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "v1\n");

        pop(&repo).expect("pop");
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "v2\n");
    }

    #[test]
    fn clean_tree_stashes_nothing_and_pop_tolerates_it() {
        let dir = TempDir::new().expect("dir");
        init_repo(dir.path());
        fs::write(dir.path().join("a.txt"), "v1\n").unwrap();
        commit_all(dir.path(), "seed");

        let repo = crate::repo::open(dir.path()).expect("open");
        assert!(!save_if_dirty(&repo).expect("stash"));
        pop(&repo).expect("pop on empty stack");
    }
}
