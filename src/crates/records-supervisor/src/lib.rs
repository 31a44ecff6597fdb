//! The run supervisor (spec.md §4.5): per-case advisory locking,
//! `AgentRun` bookkeeping, and the sole entry point into `records-graph`.

mod error;
mod supervisor;

pub use error::{Result, SupervisorError};
pub use supervisor::{Supervisor, SupervisorOutcome};
