//! # gitsync-git
//!
//! The version-control collaborator: everything gitsync asks of a
//! repository, expressed over git2. Open-with-taxonomy, status collection,
//! staging, committing, stashing, and the network operations (fetch with a
//! deadline, fast-forward/rebase integration, push).
//!
//! git2 handles are never held across operations; each function re-opens
//! the repository from the [`WatchedRepo`](gitsync_core::WatchedRepo) path,
//! which keeps every entry point `Send`-friendly for `spawn_blocking`.

pub mod commit;
pub mod error;
pub mod remote;
pub mod repo;
pub mod stash;
pub mod status;

#[cfg(test)]
pub(crate) mod testutil;

pub use commit::{commit_staged, stage_changes};
pub use error::{GitError, Result};
pub use remote::{fetch, integrate_upstream, push, SyncAction};
pub use repo::open;
pub use stash::{pop as stash_pop, save_if_dirty as stash_save_if_dirty};
pub use status::collect_changes;
