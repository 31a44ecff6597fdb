//! `GET /api/cases/:case_id/agent-state` — a read-only snapshot of the
//! case graph's checkpoint, mirroring the original's
//! `{ threadId, state, next, isInterrupted, interruptData }` shape.

use axum::extract::{Path, State};
use axum::Json;
use records_core::CaseId;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::models::AgentStateResponse;
use crate::routes::AppState;

const INTERRUPT_NODE: &str = "gate_or_execute";

pub async fn get_agent_state(
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> ApiResult<Json<AgentStateResponse>> {
    let thread_id = format!("case:{case_id}");
    let loaded = state
        .checkpointer
        .load(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no checkpoint for case {case_id}")))?;

    let is_interrupted = loaded.node_name == INTERRUPT_NODE;
    let interrupt_data = if is_interrupted {
        Some(json!({
            "proposalId": loaded.state_snapshot.get("proposal_id"),
            "proposalKey": loaded.state_snapshot.get("proposal_key"),
            "pauseReason": loaded.state_snapshot.get("pause_reason"),
        }))
    } else {
        None
    };

    Ok(Json(AgentStateResponse {
        thread_id,
        state: loaded.state_snapshot,
        next: Some(loaded.node_name),
        is_interrupted,
        interrupt_data,
    }))
}
