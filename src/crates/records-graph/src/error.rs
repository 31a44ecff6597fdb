//! Errors surfaced by the case graph.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("store error: {0}")]
    Store(#[from] records_store::StoreError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] records_checkpoint::CheckpointError),

    #[error("llm error: {0}")]
    Llm(#[from] records_llm::LlmError),

    #[error("executor error: {0}")]
    Executor(#[from] records_executor::ExecutorError),

    #[error("corrupted checkpoint for thread {0}: {1}")]
    CorruptedCheckpoint(String, serde_json::Error),

    #[error("unknown node name in checkpoint: {0}")]
    UnknownNode(String),

    #[error("graph run failed: {0}")]
    RunFailed(String),
}
