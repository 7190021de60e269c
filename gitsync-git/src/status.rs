//! Polling change collection: working-tree status → [`ChangeSet`].

use std::path::PathBuf;

use git2::StatusOptions;

use gitsync_core::{ChangeKind, ChangeSet, WatchedRepo};

use crate::error::Result;
use crate::repo::open_inner;

/// Enumerate working-tree status and classify every differing path.
///
/// Index-level flags are folded in alongside worktree flags so that changes
/// staged by a cycle that later failed to commit are picked up again on the
/// next pass. Ignored and conflicted paths are skipped; conflicts are
/// surfaced by the rebase step, not staged over.
pub fn collect_changes(repo: &WatchedRepo) -> Result<ChangeSet> {
    let git = open_inner(&repo.path)?;

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .exclude_submodules(true)
        .renames_index_to_workdir(true)
        .renames_head_to_index(true);

    let statuses = git.statuses(Some(&mut opts))?;
    let mut changes = ChangeSet::new();
    for entry in statuses.iter() {
        let status = entry.status();
        if status.is_ignored() || status.is_conflicted() {
            continue;
        }

        if status.is_wt_renamed() || status.is_index_renamed() {
            let delta = entry.index_to_workdir().or_else(|| entry.head_to_index());
            if let Some(delta) = delta {
                if let (Some(from), Some(to)) =
                    (delta.old_file().path(), delta.new_file().path())
                {
                    changes.record_rename(from.to_path_buf(), to.to_path_buf());
                    continue;
                }
            }
        }

        let Some(path) = entry.path() else { continue };
        let path = PathBuf::from(path);

        if status.is_wt_deleted() || status.is_index_deleted() {
            changes.record(path, ChangeKind::Deleted);
        } else if status.is_wt_new() || status.is_index_new() {
            changes.record(path, ChangeKind::Added);
        } else if status.is_wt_modified()
            || status.is_index_modified()
            || status.is_wt_typechange()
            || status.is_index_typechange()
        {
            changes.record(path, ChangeKind::Modified);
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::testutil::{commit_all, init_repo};

    #[test]
    fn classifies_added_modified_deleted() {
        let dir = TempDir::new().expect("dir");
        init_repo(dir.path());
        fs::write(dir.path().join("keep.txt"), "v1\n").unwrap();
        fs::write(dir.path().join("gone.txt"), "bye\n").unwrap();
        commit_all(dir.path(), "seed");

        fs::write(dir.path().join("keep.txt"), "v2\n").unwrap();
        fs::write(dir.path().join("fresh.txt"), "hi\n").unwrap();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();

        let repo = crate::repo::open(dir.path()).expect("open");
        let changes = collect_changes(&repo).expect("collect");

        assert_eq!(changes.get(Path::new("fresh.txt")), Some(&ChangeKind::Added));
        assert_eq!(
            changes.get(Path::new("keep.txt")),
            Some(&ChangeKind::Modified)
        );
        assert_eq!(changes.get(Path::new("gone.txt")), Some(&ChangeKind::Deleted));
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn clean_tree_yields_empty_set() {
        let dir = TempDir::new().expect("dir");
        init_repo(dir.path());
        fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        commit_all(dir.path(), "seed");

        let repo = crate::repo::open(dir.path()).expect("open");
        let changes = collect_changes(&repo).expect("collect");
        assert!(changes.is_empty());
    }

    #[test]
    fn repository_metadata_is_never_reported() {
        let dir = TempDir::new().expect("dir");
        init_repo(dir.path());
        fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        commit_all(dir.path(), "seed");

        let repo = crate::repo::open(dir.path()).expect("open");
        let changes = collect_changes(&repo).expect("collect");
        assert!(changes
            .iter()
            .all(|(path, _)| !path.starts_with(".git")));
    }
}
