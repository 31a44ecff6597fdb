//! Persists the case graph's run state, keyed by `thread_id = "case:<id>"`
//! (spec.md §4.2). Mirrors the shape of the teacher's `langgraph-checkpoint`
//! crate — a `CheckpointSaver` trait plus in-memory and Postgres
//! implementations — without the channel/Pregel machinery that crate
//! carries for a general graph engine, since the case graph is a fixed
//! pipeline, not an arbitrary DAG.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointSaver;
pub use postgres::PgCheckpointSaver;
pub use traits::{CheckpointSaver, LoadedCheckpoint};
