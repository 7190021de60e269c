//! Event-driven change collection: raw notify events → [`ChangeSet`] entries.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use gitsync_core::{ChangeKind, ChangeSet};

/// Fold one filesystem event into the pending changeset.
///
/// Paths are made repository-relative by stripping the watched root; events
/// for the repository's own metadata directory are dropped. A move
/// delivered as a single rename event becomes one `Renamed` entry, never a
/// delete + add pair.
pub fn translate(event: &Event, repo_root: &Path, pending: &mut ChangeSet) {
    match &event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if let Some(rel) = relativize(path, repo_root) {
                    pending.record(rel, ChangeKind::Added);
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                if let Some(rel) = relativize(path, repo_root) {
                    pending.record(rel, ChangeKind::Deleted);
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => translate_rename(event, repo_root, pending, mode),
        EventKind::Modify(ModifyKind::Metadata(_)) => {}
        EventKind::Modify(_) => {
            for path in &event.paths {
                if let Some(rel) = relativize(path, repo_root) {
                    pending.record(rel, ChangeKind::Modified);
                }
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
}

fn translate_rename(event: &Event, repo_root: &Path, pending: &mut ChangeSet, mode: &RenameMode) {
    match mode {
        RenameMode::Both => {
            let from = event.paths.first().and_then(|p| relativize(p, repo_root));
            let to = event.paths.get(1).and_then(|p| relativize(p, repo_root));
            match (from, to) {
                (Some(from), Some(to)) => pending.record_rename(from, to),
                // One side left the repository (or was metadata): the
                // remaining side degrades to a plain add or delete.
                (Some(from), None) => pending.record(from, ChangeKind::Deleted),
                (None, Some(to)) => pending.record(to, ChangeKind::Added),
                (None, None) => {}
            }
        }
        RenameMode::From => {
            if let Some(rel) = event.paths.first().and_then(|p| relativize(p, repo_root)) {
                pending.record(rel, ChangeKind::Deleted);
            }
        }
        RenameMode::To => {
            if let Some(rel) = event.paths.first().and_then(|p| relativize(p, repo_root)) {
                pending.record(rel, ChangeKind::Added);
            }
        }
        RenameMode::Any | RenameMode::Other => {
            // Backend could not say which side this is; let the existence
            // check decide. Status is re-read at commit time anyway.
            for path in &event.paths {
                let Some(rel) = relativize(path, repo_root) else { continue };
                if path.exists() {
                    pending.record(rel, ChangeKind::Added);
                } else {
                    pending.record(rel, ChangeKind::Deleted);
                }
            }
        }
    }
}

/// Repository-relative path, or `None` for paths outside the root or under
/// the `.git` metadata directory.
fn relativize(path: &Path, repo_root: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(repo_root).ok()?;
    if rel.as_os_str().is_empty() || is_metadata(rel) {
        return None;
    }
    Some(rel.to_path_buf())
}

fn is_metadata(rel: &Path) -> bool {
    rel.components().any(|c| c.as_os_str() == ".git")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/repo")
    }

    #[test]
    fn create_and_remove_events_become_entries() {
        let mut pending = ChangeSet::new();
        translate(
            &Event::new(EventKind::Create(notify::event::CreateKind::File))
                .add_path(PathBuf::from("/repo/a.txt")),
            &root(),
            &mut pending,
        );
        translate(
            &Event::new(EventKind::Remove(notify::event::RemoveKind::File))
                .add_path(PathBuf::from("/repo/b.txt")),
            &root(),
            &mut pending,
        );

        assert_eq!(pending.get(Path::new("a.txt")), Some(&ChangeKind::Added));
        assert_eq!(pending.get(Path::new("b.txt")), Some(&ChangeKind::Deleted));
    }

    #[test]
    fn rename_both_is_one_entry() {
        let mut pending = ChangeSet::new();
        translate(
            &Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
                .add_path(PathBuf::from("/repo/old.txt"))
                .add_path(PathBuf::from("/repo/new.txt")),
            &root(),
            &mut pending,
        );

        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending.get(Path::new("new.txt")),
            Some(&ChangeKind::Renamed {
                from: PathBuf::from("old.txt")
            })
        );
    }

    #[test]
    fn metadata_directory_is_excluded() {
        let mut pending = ChangeSet::new();
        translate(
            &Event::new(EventKind::Modify(ModifyKind::Data(
                notify::event::DataChange::Content,
            )))
            .add_path(PathBuf::from("/repo/.git/index")),
            &root(),
            &mut pending,
        );
        translate(
            &Event::new(EventKind::Create(notify::event::CreateKind::File))
                .add_path(PathBuf::from("/repo/.git/objects/ab/cdef")),
            &root(),
            &mut pending,
        );

        assert!(pending.is_empty());
    }

    #[test]
    fn paths_outside_the_root_are_ignored() {
        let mut pending = ChangeSet::new();
        translate(
            &Event::new(EventKind::Create(notify::event::CreateKind::File))
                .add_path(PathBuf::from("/elsewhere/a.txt")),
            &root(),
            &mut pending,
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn modify_after_create_keeps_the_add() {
        let mut pending = ChangeSet::new();
        translate(
            &Event::new(EventKind::Create(notify::event::CreateKind::File))
                .add_path(PathBuf::from("/repo/a.txt")),
            &root(),
            &mut pending,
        );
        translate(
            &Event::new(EventKind::Modify(ModifyKind::Data(
                notify::event::DataChange::Content,
            )))
            .add_path(PathBuf::from("/repo/a.txt")),
            &root(),
            &mut pending,
        );

        assert_eq!(pending.get(Path::new("a.txt")), Some(&ChangeKind::Added));
    }
}
