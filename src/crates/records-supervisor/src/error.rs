use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Store(#[from] records_store::StoreError),

    #[error(transparent)]
    Graph(#[from] records_graph::GraphError),

    #[error("case {0} is locked by another run")]
    CaseLocked(records_core::CaseId),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
