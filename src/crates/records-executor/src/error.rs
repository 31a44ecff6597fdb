use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] records_store::StoreError),

    #[error(transparent)]
    Queue(#[from] records_queue::QueueError),

    #[error("proposal {0} has no draft to send")]
    MissingDraft(records_core::ProposalId),

    #[error("proposal {0}'s agency has no email address on file")]
    MissingAgencyEmail(records_core::ProposalId),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
