//! Errors for LLM provider implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl LlmError {
    /// Whether a caller should fall back to an `UNKNOWN`/confidence-0
    /// analysis rather than retry. Matches the spec's `ValidationError`
    /// boundary: a malformed or non-conforming provider response is never
    /// propagated as a hard failure.
    pub fn is_validation_fallback(&self) -> bool {
        matches!(self, Self::InvalidResponse(_))
    }
}
