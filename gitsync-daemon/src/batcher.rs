//! Per-repository watcher + commit batcher task.
//!
//! One task owns one repository: it subscribes to recursive filesystem
//! notifications, coalesces bursts of changes behind a quiet-period timer,
//! and hands each flush to the reconciler on the blocking pool.
//!
//! Concurrency contract: the debounce deadline is armed once per
//! idle→active transition and never re-armed by later changes in the same
//! burst, so a continuously modified file still commits once per window.
//! `flush_in_flight` is the single-flight latch — while a cycle runs, no
//! new deadline is armed; changes arriving mid-flight accumulate and arm a
//! fresh window once the flush completes.

use std::path::PathBuf;
use std::time::Duration;

use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use gitsync_core::ChangeSet;
use gitsync_engine::{CycleOutcome, EngineError, Reconciler};

use crate::collector;
use crate::error::DaemonError;

/// Watch one repository until shutdown. Returns early with an error when
/// the repository cannot be opened or watched at all; cycle-level failures
/// are logged and retried on the next flush instead.
pub async fn repo_task(
    home: PathBuf,
    repo_path: PathBuf,
    debounce: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let reconciler = {
        let home = home.clone();
        let path = repo_path.clone();
        tokio::task::spawn_blocking(move || Reconciler::open(&home, &path))
            .await
            .map_err(|err| DaemonError::Runtime(format!("reconciler open join error: {err}")))??
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    _watcher.watch(&repo_path, RecursiveMode::Recursive)?;
    tracing::info!(repo = %repo_path.display(), "watching repository");

    let (done_tx, mut done_rx) = mpsc::channel::<Result<CycleOutcome, EngineError>>(1);
    let mut pending = ChangeSet::new();
    let mut deadline: Option<Instant> = None;
    let mut flush_in_flight = false;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,

            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(repo = %repo_path.display(), error = %err, "watcher event error");
                        continue;
                    }
                };
                collector::translate(&event, &repo_path, &mut pending);
                if should_arm(&pending, &deadline, flush_in_flight) {
                    deadline = Some(Instant::now() + debounce);
                    tracing::debug!(repo = %repo_path.display(), "debounce window armed");
                }
            }

            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                deadline = None;
                flush_in_flight = true;
                let reconciler = reconciler.clone();
                let hints = std::mem::take(&mut pending);
                let done_tx = done_tx.clone();
                tokio::task::spawn_blocking(move || {
                    let result = reconciler.run_cycle(Some(&hints));
                    let _ = done_tx.blocking_send(result);
                });
            }

            result = done_rx.recv(), if flush_in_flight => {
                flush_in_flight = false;
                match result {
                    Some(outcome) => report_flush(&repo_path, outcome),
                    None => return Err(DaemonError::ChannelClosed("flush results")),
                }
                // Changes observed while the flush was running start a
                // fresh window now that the latch is clear.
                if !pending.is_empty() {
                    deadline = Some(Instant::now() + debounce);
                }
            }
        }
    }

    // Shutdown: a cancelled debounce timer never flushes, but an in-flight
    // cycle runs to completion before the task acknowledges.
    if flush_in_flight {
        if let Some(outcome) = done_rx.recv().await {
            report_flush(&repo_path, outcome);
        }
    }
    tracing::info!(repo = %repo_path.display(), "watcher stopped");
    Ok(())
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// A deadline is armed only on an idle→active transition with the
/// single-flight latch clear; later changes in the burst never re-arm it.
fn should_arm(pending: &ChangeSet, deadline: &Option<Instant>, flush_in_flight: bool) -> bool {
    !pending.is_empty() && deadline.is_none() && !flush_in_flight
}

fn report_flush(repo_path: &std::path::Path, outcome: Result<CycleOutcome, EngineError>) {
    match outcome {
        Ok(outcome) => {
            if let Some(commit) = &outcome.commit {
                tracing::info!(
                    repo = %repo_path.display(),
                    revision = %commit.revision,
                    pushed = outcome.pushed,
                    offline = outcome.offline,
                    "flush committed",
                );
            } else {
                tracing::debug!(repo = %repo_path.display(), "flush found nothing to commit");
            }
        }
        Err(err) if err.is_rebase_conflict() => {
            tracing::error!(
                repo = %repo_path.display(),
                error = %err,
                "rebase conflict; cycle abandoned, will retry",
            );
        }
        Err(err) => {
            tracing::error!(repo = %repo_path.display(), error = %err, "sync cycle failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gitsync_core::ChangeKind;

    use super::*;

    fn one_change() -> ChangeSet {
        let mut pending = ChangeSet::new();
        pending.record(PathBuf::from("a.txt"), ChangeKind::Modified);
        pending
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_of_changes_fires_exactly_once_per_window() {
        let debounce = Duration::from_millis(100);
        let pending = one_change();
        let mut deadline: Option<Instant> = None;
        let mut fired = 0usize;

        for _ in 0..5 {
            if should_arm(&pending, &deadline, false) {
                deadline = Some(Instant::now() + debounce);
            }
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        // The window is measured from the first change: five rapid changes
        // armed one deadline, which has now expired.
        if deadline.is_some_and(|at| Instant::now() >= at) {
            deadline = None;
            fired += 1;
        }
        assert_eq!(fired, 1, "rapid changes must collapse to one flush");

        // A later, separate burst arms a fresh window.
        tokio::time::advance(Duration::from_millis(200)).await;
        if should_arm(&pending, &deadline, false) {
            deadline = Some(Instant::now() + debounce);
        }
        tokio::time::advance(Duration::from_millis(150)).await;
        if deadline.is_some_and(|at| Instant::now() >= at) {
            fired += 1;
        }
        assert_eq!(fired, 2, "spaced bursts flush once each");
    }

    #[test]
    fn latch_blocks_arming_while_flush_runs() {
        let pending = one_change();
        let deadline: Option<Instant> = None;
        assert!(
            !should_arm(&pending, &deadline, true),
            "in-flight flush must gate the timer"
        );
        assert!(should_arm(&pending, &deadline, false));
        assert!(
            !should_arm(&ChangeSet::new(), &deadline, false),
            "no changes, nothing to arm"
        );
    }

    #[test]
    fn armed_deadline_is_not_rearmed_by_later_changes() {
        let pending = one_change();
        let deadline = Some(Instant::now() + Duration::from_millis(100));
        assert!(!should_arm(&pending, &deadline, false));
    }
}
