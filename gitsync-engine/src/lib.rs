//! # gitsync-engine
//!
//! The reconciliation core: the [`ConnectivityGate`], the
//! [`Reconciler`] state machine, and the [`pipeline`] entrypoint used by
//! both the one-shot CLI and the daemon's batcher.

pub mod error;
pub mod gate;
pub mod pipeline;
pub mod reconciler;

pub use error::EngineError;
pub use gate::ConnectivityGate;
pub use pipeline::{run as run_pipeline, RepoOutcome};
pub use reconciler::{commit_message, CycleOutcome, CycleState, Reconciler, FETCH_TIMEOUT};
