//! API error types and HTTP response conversion.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            message: message.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] records_store::StoreError),

    #[error(transparent)]
    Checkpoint(#[from] records_checkpoint::CheckpointError),

    #[error(transparent)]
    Queue(#[from] records_queue::QueueError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(records_store::StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Checkpoint(_) | Self::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorBody::new(
            match &self {
                Self::NotFound(_) => "NotFound",
                Self::BadRequest(_) => "BadRequest",
                Self::Store(_) => "StoreError",
                Self::Checkpoint(_) => "CheckpointError",
                Self::Queue(_) => "QueueError",
            },
            self.to_string(),
        );
        tracing::error!(error = %self, "api error");
        (status, Json(body)).into_response()
    }
}
