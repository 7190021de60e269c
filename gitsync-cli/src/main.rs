//! gitsync — keep local git working directories committed and in sync
//! with their remotes.
//!
//! # Usage
//!
//! ```text
//! gitsync                  one-shot: reconcile every configured repository once
//! gitsync --daemon         watch the configured repositories indefinitely
//! gitsync --config <path>  use an alternative settings file
//! gitsync --info           info-level logging
//! gitsync --debug          debug-level logging
//! ```
//!
//! Exits non-zero when no repository is configured or a configured path
//! could not be processed at all (missing, not a repository, unreadable).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use gitsync_core::paths::settings_path;
use gitsync_core::{settings, Config};
use gitsync_engine::{run_pipeline, CycleOutcome, RepoOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "gitsync",
    version,
    about = "A git-based synchronisation daemon",
    long_about = None,
)]
struct Cli {
    /// Configuration file to use instead of `~/.gitsync/config.yaml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Expand the level of information returned.
    #[arg(long)]
    info: bool,

    /// Expand even more the level of information returned.
    #[arg(long)]
    debug: bool,

    /// Run gitsync in daemon mode.
    #[arg(long)]
    daemon: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let home = dirs::home_dir().context("could not determine home directory")?;
    let config_file = cli
        .config
        .clone()
        .unwrap_or_else(|| settings_path(&home));
    let loaded = settings::load_or_init(&config_file)
        .with_context(|| format!("failed to load settings from {}", config_file.display()))?;
    let config = Config::from_settings(&loaded, &home, cli.daemon);

    if config.repositories.is_empty() {
        anyhow::bail!(
            "no git repository configured in {}; set `work_dir` to a comma-separated list of paths",
            config_file.display()
        );
    }

    if config.daemon {
        gitsync_daemon::start_blocking(&home, &config).context("daemon exited with error")?;
        return Ok(());
    }

    let outcomes = run_pipeline(&home, &config.repositories);
    let mut unprocessable = 0usize;
    for outcome in &outcomes {
        print_outcome(outcome);
        if outcome
            .result
            .as_ref()
            .is_err_and(|err| err.is_configuration())
        {
            unprocessable += 1;
        }
    }
    if unprocessable > 0 {
        anyhow::bail!("{unprocessable} configured repository path(s) could not be processed");
    }
    Ok(())
}

fn print_outcome(outcome: &RepoOutcome) {
    let path = outcome.path.display();
    match &outcome.result {
        Ok(cycle) => println!("{} {} — {}", "✓".green(), path, summarize(cycle)),
        Err(err) => println!("{} {} — {}", "✗".red(), path, err),
    }
}

fn summarize(cycle: &CycleOutcome) -> String {
    match &cycle.commit {
        None if cycle.offline => "up to date locally (remote unreachable)".to_string(),
        None => "up to date".to_string(),
        Some(commit) => {
            let revision = &commit.revision[..7.min(commit.revision.len())];
            if cycle.pushed {
                format!("committed {revision} ({} changes), pushed", cycle.changes)
            } else if cycle.offline {
                format!(
                    "committed {revision} ({} changes), offline — push deferred",
                    cycle.changes
                )
            } else {
                format!("committed {revision} ({} changes)", cycle.changes)
            }
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if cli.debug {
        "debug"
    } else if cli.info {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
