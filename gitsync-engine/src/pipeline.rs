//! One-shot entrypoint shared by the CLI and (via the batcher) the daemon.

use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::reconciler::{CycleOutcome, Reconciler};

/// Result of processing one configured repository path.
#[derive(Debug)]
pub struct RepoOutcome {
    pub path: PathBuf,
    pub result: Result<CycleOutcome, EngineError>,
}

/// Run one reconciliation cycle for every configured repository path.
///
/// A repository that cannot be processed is reported in its outcome and
/// never aborts the remaining paths.
pub fn run(home: &Path, repositories: &[PathBuf]) -> Vec<RepoOutcome> {
    repositories
        .iter()
        .map(|path| {
            tracing::info!(repo = %path.display(), "processing repository");
            let result =
                Reconciler::open(home, path).and_then(|reconciler| reconciler.run_cycle(None));
            match &result {
                Ok(outcome) => tracing::debug!(
                    repo = %path.display(),
                    changes = outcome.changes,
                    pushed = outcome.pushed,
                    offline = outcome.offline,
                    "repository processed",
                ),
                Err(err) => tracing::error!(
                    repo = %path.display(),
                    error = %err,
                    "repository sync failed",
                ),
            }
            RepoOutcome {
                path: path.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn run_with_no_repositories_returns_empty_vec() {
        let home = TempDir::new().expect("home");
        let outcomes = run(home.path(), &[]);
        assert!(outcomes.is_empty());
    }

    #[test]
    fn invalid_path_is_reported_but_does_not_abort_the_rest() {
        let home = TempDir::new().expect("home");
        let valid = TempDir::new().expect("valid");
        git2::Repository::init(valid.path()).expect("init");

        let missing = home.path().join("missing");
        let outcomes = run(home.path(), &[missing, valid.path().to_path_buf()]);

        assert_eq!(outcomes.len(), 2);
        let err = outcomes[0].result.as_ref().unwrap_err();
        assert!(err.is_configuration());
        assert!(outcomes[1].result.is_ok());
    }
}
