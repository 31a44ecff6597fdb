//! The `CheckpointSaver` trait: persists the case graph's run state under
//! `thread_id = "case:<caseId>"` (spec.md §4.2).
//!
//! The snapshot itself is opaque to this crate — a `serde_json::Value`
//! produced by `records-graph`'s `CaseState` — so `records-checkpoint` has
//! no dependency on the graph crate, mirroring how the teacher's
//! `langgraph-checkpoint` knows nothing about `langgraph-core`'s node
//! types.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// What a single `load` returns: the node to resume from, its state
/// snapshot, and (at most once) a pending human-injected value set by a
/// prior `resume` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCheckpoint {
    pub node_name: String,
    pub state_snapshot: Value,
    pub interrupt_value: Option<Value>,
}

#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Persists a snapshot atomically, overwriting whatever was previously
    /// saved for `thread_id`. Returns an opaque checkpoint ID. Clears any
    /// pending interrupt value: a fresh save always starts a new segment.
    async fn save(&self, thread_id: &str, node_name: &str, state_snapshot: Value) -> Result<String>;

    /// Loads the most recent checkpoint for `thread_id`, if any. Delivers
    /// a pending interrupt value at most once: after this call returns
    /// `Some(interrupt_value)`, the next `load` sees `None` for it.
    async fn load(&self, thread_id: &str) -> Result<Option<LoadedCheckpoint>>;

    /// Sets the pending interrupt result so the next `load` yields it,
    /// without otherwise touching the saved node/state. Returns the
    /// `(node_name, state_snapshot)` the graph should resume from.
    async fn resume(&self, thread_id: &str, injected_value: Value) -> Result<(String, Value)>;

    /// Removes a thread's checkpoint entirely. Used when a case reaches a
    /// terminal status and its run history no longer needs a resumable
    /// snapshot.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
