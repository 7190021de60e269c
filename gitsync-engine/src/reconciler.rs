//! Repository reconciler — the per-cycle stash / fetch / rebase / stage /
//! commit / push state machine.
//!
//! Cycle shape: `Idle → Syncing → Committing → Pushing → Idle`, with the
//! offline gate short-circuiting the network-touching transitions. The
//! steps of one cycle run strictly sequentially; callers are responsible
//! for never running two cycles against the same repository concurrently
//! (the daemon's batcher enforces this with its single-flight latch).

use std::path::Path;
use std::time::Duration;

use gitsync_core::{ChangeKind, ChangeSet, CommitRecord, WatchedRepo};
use gitsync_git as git;

use crate::error::EngineError;
use crate::gate::ConnectivityGate;

/// Deadline for one fetch; expiry counts as a fetch failure.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Phase labels used in cycle traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Syncing,
    Committing,
    Pushing,
}

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Number of path-level changes observed at commit time.
    pub changes: usize,
    /// The commit created this cycle, if any.
    pub commit: Option<CommitRecord>,
    /// Whether the commit reached the remote.
    pub pushed: bool,
    /// Whether the cycle ended with the gate offline.
    pub offline: bool,
}

enum Presync {
    Synced(git::SyncAction),
    Offline,
    NoRemote,
}

impl Presync {
    /// Local commits exist that the remote has not seen yet.
    fn local_ahead(&self) -> bool {
        matches!(
            self,
            Presync::Synced(git::SyncAction::AlreadyAhead | git::SyncAction::Rebased(_))
        )
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    repo: WatchedRepo,
    gate: ConnectivityGate,
    fetch_timeout: Duration,
}

impl Reconciler {
    /// Bind a reconciler to one working directory. Fails with the
    /// configuration-error taxonomy when the path is missing, not a
    /// repository, or unreadable.
    pub fn open(home: &Path, repo_path: &Path) -> Result<Self, EngineError> {
        let repo = git::open(repo_path)?;
        let gate = ConnectivityGate::new(home, repo_path);
        Ok(Self {
            repo,
            gate,
            fetch_timeout: FETCH_TIMEOUT,
        })
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn repo(&self) -> &WatchedRepo {
        &self.repo
    }

    pub fn is_offline(&self) -> bool {
        self.gate.is_offline()
    }

    /// Run one full reconciliation cycle.
    ///
    /// `rename_hints` carries move events observed by a filesystem watcher;
    /// status is still re-read from the repository here, so the last
    /// observed filesystem state always wins — the hints only pair a
    /// delete+add back into a single rename.
    ///
    /// A rebase conflict abandons the cycle with a distinct error; the
    /// working tree is left restored and the cycle is retried later.
    pub fn run_cycle(&self, rename_hints: Option<&ChangeSet>) -> Result<CycleOutcome, EngineError> {
        let mut outcome = CycleOutcome::default();

        tracing::debug!(repo = %self.repo.path.display(), state = ?CycleState::Syncing, "cycle started");
        let presync = self.pre_sync()?;
        outcome.offline = matches!(presync, Presync::Offline);

        tracing::debug!(repo = %self.repo.path.display(), state = ?CycleState::Committing, "collecting changes");
        let mut changes = git::collect_changes(&self.repo)?;
        if let Some(hints) = rename_hints {
            apply_rename_hints(&mut changes, hints);
        }
        outcome.changes = changes.len();

        if !changes.is_empty() {
            let message = commit_message(&changes);
            git::stage_changes(&self.repo, &changes)?;
            if let Some(record) = git::commit_staged(&self.repo, &message)? {
                tracing::info!(
                    repo = %self.repo.path.display(),
                    revision = %record.revision,
                    message = %record.message,
                    "committed",
                );
                outcome.commit = Some(record);
            }
        }

        // Push when this cycle created a commit, or when earlier cycles
        // left local commits the remote has not seen (e.g. made offline).
        let push_needed = outcome.commit.is_some() || presync.local_ahead();
        if !push_needed {
            tracing::debug!(repo = %self.repo.path.display(), state = ?CycleState::Idle, "nothing to push");
            return Ok(outcome);
        }
        if self.repo.remote.is_none() || self.gate.is_offline() {
            outcome.offline = self.gate.is_offline();
            return Ok(outcome);
        }

        tracing::debug!(repo = %self.repo.path.display(), state = ?CycleState::Pushing, "pushing");
        // The remote may have advanced since the first pre-sync; rebasing
        // again first minimizes push rejection.
        match self.pre_sync()? {
            Presync::Offline => {
                outcome.offline = true;
            }
            Presync::Synced(_) | Presync::NoRemote => match git::push(&self.repo) {
                Ok(()) => {
                    outcome.pushed = true;
                    tracing::info!(repo = %self.repo.path.display(), "pushed to remote");
                }
                Err(err) => {
                    // The commit stays local and is retried next cycle.
                    tracing::warn!(
                        repo = %self.repo.path.display(),
                        error = %err,
                        "push failed; commit kept for next cycle",
                    );
                }
            },
        }
        Ok(outcome)
    }

    /// Stash, fetch, integrate (fast-forward or rebase), unstash.
    ///
    /// The fetch is attempted even while the gate is offline — it is the
    /// retry probe that eventually clears the marker. Failure marks the
    /// gate offline with a warning on the transition only; later cycles
    /// log at debug to avoid a log storm.
    fn pre_sync(&self) -> Result<Presync, EngineError> {
        if self.repo.remote.is_none() {
            return Ok(Presync::NoRemote);
        }

        let stashed = git::stash_save_if_dirty(&self.repo)?;
        let result = match git::fetch(&self.repo, self.fetch_timeout) {
            Ok(()) => match git::integrate_upstream(&self.repo) {
                Ok(action) => {
                    if self.gate.mark_online()? {
                        tracing::info!(
                            repo = %self.repo.path.display(),
                            "remote reachable again; resuming pushes",
                        );
                    }
                    tracing::debug!(repo = %self.repo.path.display(), ?action, "integrated upstream");
                    Ok(Presync::Synced(action))
                }
                Err(err) => Err(EngineError::from(err)),
            },
            Err(err) => {
                if self.gate.mark_offline()? {
                    tracing::warn!(
                        repo = %self.repo.path.display(),
                        error = %err,
                        "could not fetch from the remote repository; going offline",
                    );
                } else {
                    tracing::debug!(
                        repo = %self.repo.path.display(),
                        error = %err,
                        "remote still unreachable",
                    );
                }
                Ok(Presync::Offline)
            }
        };
        if stashed {
            git::stash_pop(&self.repo)?;
        }
        result
    }
}

/// Commit message policy: one commit per cycle. A single change uses its
/// own line ("Add file X"); several changes get a summary subject with the
/// per-path lines as the body.
pub fn commit_message(changes: &ChangeSet) -> String {
    let mut lines = changes.iter().map(|(path, kind)| kind.describe(path));
    match changes.len() {
        0 => String::new(),
        1 => lines.next().unwrap_or_default(),
        n => {
            let mut message = format!("Sync {n} files\n");
            for line in lines {
                message.push('\n');
                message.push_str(&line);
            }
            message
        }
    }
}

/// Fold watcher-observed moves into a status-derived changeset: when status
/// reports the destination as added and the source as deleted (or gone),
/// collapse the pair into one `Renamed` entry.
fn apply_rename_hints(changes: &mut ChangeSet, hints: &ChangeSet) {
    for (to, kind) in hints {
        let ChangeKind::Renamed { from } = kind else {
            continue;
        };
        let to_added = matches!(changes.get(to), Some(ChangeKind::Added | ChangeKind::Renamed { .. }));
        let from_gone = matches!(changes.get(from), None | Some(ChangeKind::Deleted));
        if to_added && from_gone {
            changes.record_rename(from.clone(), to.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;

    fn set(entries: &[(&str, ChangeKind)]) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (path, kind) in entries {
            changes.record(PathBuf::from(path), kind.clone());
        }
        changes
    }

    #[test]
    fn single_change_message_is_the_describe_line() {
        let changes = set(&[("notes.txt", ChangeKind::Added)]);
        assert_eq!(commit_message(&changes), "Add file notes.txt");
    }

    #[test]
    fn multi_change_message_has_summary_subject_and_body() {
        let changes = set(&[
            ("a.txt", ChangeKind::Added),
            ("b.txt", ChangeKind::Modified),
            ("c.txt", ChangeKind::Deleted),
        ]);
        let message = commit_message(&changes);
        let mut lines = message.lines();
        assert_eq!(lines.next(), Some("Sync 3 files"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("Add file a.txt"));
        assert_eq!(lines.next(), Some("Update file b.txt"));
        assert_eq!(lines.next(), Some("Remove file c.txt"));
    }

    #[test]
    fn rename_hint_collapses_delete_add_pair() {
        let mut changes = set(&[
            ("new.txt", ChangeKind::Added),
            ("old.txt", ChangeKind::Deleted),
        ]);
        let mut hints = ChangeSet::new();
        hints.record_rename(PathBuf::from("old.txt"), PathBuf::from("new.txt"));

        apply_rename_hints(&mut changes, &hints);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get(Path::new("new.txt")),
            Some(&ChangeKind::Renamed {
                from: PathBuf::from("old.txt")
            })
        );
    }

    #[test]
    fn rename_hint_is_ignored_when_status_disagrees() {
        // The destination was re-deleted after the move event: status no
        // longer reports it as added, so the hint must not resurrect it.
        let mut changes = set(&[("old.txt", ChangeKind::Deleted)]);
        let mut hints = ChangeSet::new();
        hints.record_rename(PathBuf::from("old.txt"), PathBuf::from("new.txt"));

        apply_rename_hints(&mut changes, &hints);
        assert_eq!(
            changes.get(Path::new("old.txt")),
            Some(&ChangeKind::Deleted)
        );
        assert!(changes.get(Path::new("new.txt")).is_none());
    }
}
