//! The HTTP surface (spec.md §6): an inbound-mail webhook, the four
//! human-decision endpoints, and a read-only agent-state query. Every
//! handler here only enqueues jobs or reads persisted/checkpointed state —
//! the case graph itself only ever runs in the worker process, via
//! `records-supervisor`.

mod error;
mod handlers;
mod models;
mod routes;

pub use error::{ApiError, ApiResult};
pub use models::{AdjustRequest, AgentStateResponse, InboundMailPayload, InboundMailResponse, ResumeResponse};
pub use routes::{create_router, AppState};
