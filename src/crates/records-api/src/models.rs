//! Request/response DTOs for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/cases/:case_id/proposals/:proposal_id/adjust`. The
/// other three decision endpoints (approve/dismiss/withdraw) take no body.
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustRequest {
    pub instruction: String,
}

/// Shared response shape for all four human-decision endpoints, matching
/// `routes/requests.js`'s `{ success, message, jobId }`.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeResponse {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

/// Body of the inbound mail webhook. Mirrors the fields the original
/// analysis worker reads off an inbound provider payload before deciding
/// whether to queue an agent job.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMailPayload {
    pub provider_message_id: Option<String>,
    /// The RFC 2822 `In-Reply-To` header, used to thread the reply back to
    /// the outbound message it answers.
    pub in_reply_to: Option<String>,
    pub from_email: String,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundMailResponse {
    pub success: bool,
    pub case_id: i64,
    pub message_id: i64,
    pub job_id: String,
}

/// `GET /api/cases/:case_id/agent-state`, mirroring the original's
/// `{ threadId, state, next, isInterrupted, interruptData }` snapshot shape.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStateResponse {
    pub thread_id: String,
    pub state: Value,
    pub next: Option<String>,
    pub is_interrupted: bool,
    pub interrupt_data: Option<Value>,
}
