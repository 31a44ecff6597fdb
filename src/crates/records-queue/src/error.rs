use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("job {0} exceeded its maximum attempts")]
    AttemptsExhausted(String),

    #[error("job {0} timed out")]
    TimedOut(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
