//! Daemon runtime: per-repository filesystem watcher, commit batcher, and
//! graceful shutdown.

pub mod batcher;
pub mod collector;
mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{run, start_blocking};
