//! In-memory reference [`CheckpointSaver`], mirroring the teacher's
//! `InMemoryCheckpointSaver`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CheckpointError, Result};
use crate::traits::{CheckpointSaver, LoadedCheckpoint};

struct Row {
    node_name: String,
    state_snapshot: Value,
    interrupt_value: Option<Value>,
    checkpoint_id: String,
}

#[derive(Default)]
pub struct InMemoryCheckpointSaver {
    threads: Mutex<HashMap<String, Row>>,
    next_id: Mutex<u64>,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_checkpoint_id(&self) -> String {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        format!("ckpt-{}", *next_id)
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn save(&self, thread_id: &str, node_name: &str, state_snapshot: Value) -> Result<String> {
        let checkpoint_id = self.next_checkpoint_id();
        self.threads.lock().unwrap().insert(
            thread_id.to_string(),
            Row {
                node_name: node_name.to_string(),
                state_snapshot,
                interrupt_value: None,
                checkpoint_id: checkpoint_id.clone(),
            },
        );
        Ok(checkpoint_id)
    }

    async fn load(&self, thread_id: &str) -> Result<Option<LoadedCheckpoint>> {
        let mut threads = self.threads.lock().unwrap();
        let Some(row) = threads.get_mut(thread_id) else {
            return Ok(None);
        };
        Ok(Some(LoadedCheckpoint {
            node_name: row.node_name.clone(),
            state_snapshot: row.state_snapshot.clone(),
            interrupt_value: row.interrupt_value.take(),
        }))
    }

    async fn resume(&self, thread_id: &str, injected_value: Value) -> Result<(String, Value)> {
        let mut threads = self.threads.lock().unwrap();
        let row = threads
            .get_mut(thread_id)
            .ok_or_else(|| CheckpointError::NotFound(thread_id.to_string()))?;
        row.interrupt_value = Some(injected_value);
        Ok((row.node_name.clone(), row.state_snapshot.clone()))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.lock().unwrap().remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn load_returns_none_for_unknown_thread() {
        let saver = InMemoryCheckpointSaver::new();
        assert!(saver.load("case:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_state() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .save("case:1", "decide_next_action", json!({"iteration": 1}))
            .await
            .unwrap();
        let loaded = saver.load("case:1").await.unwrap().unwrap();
        assert_eq!(loaded.node_name, "decide_next_action");
        assert_eq!(loaded.state_snapshot, json!({"iteration": 1}));
        assert_eq!(loaded.interrupt_value, None);
    }

    #[tokio::test]
    async fn resume_delivers_interrupt_value_exactly_once() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .save("case:1", "gate_or_execute", json!({"iteration": 2}))
            .await
            .unwrap();
        saver
            .resume("case:1", json!({"action": "APPROVE"}))
            .await
            .unwrap();

        let first_load = saver.load("case:1").await.unwrap().unwrap();
        assert_eq!(first_load.interrupt_value, Some(json!({"action": "APPROVE"})));

        let second_load = saver.load("case:1").await.unwrap().unwrap();
        assert_eq!(second_load.interrupt_value, None);
    }

    #[tokio::test]
    async fn resume_on_unknown_thread_is_not_found() {
        let saver = InMemoryCheckpointSaver::new();
        let result = saver.resume("case:999", json!(null)).await;
        assert!(matches!(result, Err(CheckpointError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_clears_any_stale_interrupt_value() {
        let saver = InMemoryCheckpointSaver::new();
        saver.save("case:1", "gate_or_execute", json!({})).await.unwrap();
        saver.resume("case:1", json!({"action": "ADJUST"})).await.unwrap();
        saver.save("case:1", "draft_response", json!({"adjusted": true})).await.unwrap();
        let loaded = saver.load("case:1").await.unwrap().unwrap();
        assert_eq!(loaded.interrupt_value, None);
    }

    #[tokio::test]
    async fn delete_thread_removes_checkpoint() {
        let saver = InMemoryCheckpointSaver::new();
        saver.save("case:1", "commit_state", json!({})).await.unwrap();
        saver.delete_thread("case:1").await.unwrap();
        assert!(saver.load("case:1").await.unwrap().is_none());
    }
}
