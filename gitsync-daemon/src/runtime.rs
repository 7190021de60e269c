//! Daemon runtime: one watcher + batcher task per configured repository,
//! plus ctrl-c handling and broadcast shutdown.

use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use gitsync_core::Config;

use crate::batcher;
use crate::error::{io_err, DaemonError};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, config: &Config) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config.clone()))
}

/// Run the daemon runtime.
///
/// A repository whose watcher fails (invalid path, not a repository) is
/// reported and skipped; the remaining watchers keep running. The process
/// does not exit until every task has acknowledged shutdown.
pub async fn run(home: PathBuf, config: Config) -> Result<(), DaemonError> {
    if config.repositories.is_empty() {
        return Err(DaemonError::NoRepositories);
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let mut repo_handles = Vec::with_capacity(config.repositories.len());
    for path in &config.repositories {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let path = path.clone();
        let debounce = config.debounce;
        repo_handles.push(tokio::spawn(async move {
            let result =
                batcher::repo_task(home, path.clone(), debounce, shutdown.subscribe()).await;
            if let Err(err) = &result {
                tracing::error!(repo = %path.display(), error = %err, "repository watcher stopped");
            }
            result
        }));
    }

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => {
                            let _ = shutdown.send(());
                            Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}")))
                        }
                    }
                }
            }
        })
    };

    // Per-repository failures were already reported; they must not take
    // the daemon down, so only join errors surface from here.
    for handle in repo_handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "watcher task join failure");
        }
    }
    handle_join("signal_handler", signal_handle.await)?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    #[tokio::test]
    async fn run_without_repositories_is_a_configuration_error() {
        let home = TempDir::new().expect("home");
        let config = Config {
            repositories: vec![],
            daemon: true,
            debounce: Duration::from_secs(10),
        };
        let err = run(home.path().to_path_buf(), config).await.unwrap_err();
        assert!(matches!(err, DaemonError::NoRepositories));
    }

    #[tokio::test]
    async fn shutdown_drains_all_watchers() {
        let home = TempDir::new().expect("home");
        let repo = TempDir::new().expect("repo");
        git2::Repository::init(repo.path()).expect("init");

        let config = Config {
            repositories: vec![repo.path().to_path_buf()],
            daemon: true,
            debounce: Duration::from_millis(50),
        };

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task = tokio::spawn(batcher::repo_task(
            home.path().to_path_buf(),
            repo.path().to_path_buf(),
            config.debounce,
            shutdown_tx.subscribe(),
        ));

        // Give the watcher a moment to subscribe, then stop it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).expect("send shutdown");

        let joined = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("watcher must acknowledge shutdown");
        joined.expect("join").expect("clean exit");
    }
}
