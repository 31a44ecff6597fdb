//! The four human-decision endpoints: approve, adjust, dismiss, withdraw.
//! Each enqueues a `resume_from_human` job and returns immediately — the
//! actual graph resume happens in the worker process (spec.md §4.5).

use axum::extract::{Path, State};
use axum::Json;
use records_core::{CaseId, HumanDecision, HumanDecisionAction, ProposalId};
use records_queue::AgentJob;

use crate::error::{ApiError, ApiResult};
use crate::models::{AdjustRequest, ResumeResponse};
use crate::routes::AppState;

fn job_id(case_id: CaseId, proposal_id: ProposalId, action: HumanDecisionAction) -> String {
    format!("resume:{case_id}:{proposal_id}:{action:?}")
}

async fn enqueue_decision(
    state: &AppState,
    case_id: CaseId,
    proposal_id: ProposalId,
    decision: HumanDecision,
) -> ApiResult<String> {
    let id = job_id(case_id, proposal_id, decision.action);
    let job = AgentJob::ResumeFromHuman { case_id, proposal_id, human_decision: decision };
    state.agent_queue.enqueue(id.clone(), job).await?;
    Ok(id)
}

pub async fn approve(
    State(state): State<AppState>,
    Path((case_id, proposal_id)): Path<(CaseId, ProposalId)>,
) -> ApiResult<Json<ResumeResponse>> {
    let decision = HumanDecision { action: HumanDecisionAction::Approve, instruction: None };
    let job_id = enqueue_decision(&state, case_id, proposal_id, decision).await?;
    Ok(Json(ResumeResponse { success: true, message: "Approval queued".to_string(), job_id }))
}

pub async fn adjust(
    State(state): State<AppState>,
    Path((case_id, proposal_id)): Path<(CaseId, ProposalId)>,
    Json(body): Json<AdjustRequest>,
) -> ApiResult<Json<ResumeResponse>> {
    if body.instruction.trim().is_empty() {
        return Err(ApiError::BadRequest("adjustment instruction required".to_string()));
    }
    let decision = HumanDecision {
        action: HumanDecisionAction::Adjust,
        instruction: Some(body.instruction),
    };
    let job_id = enqueue_decision(&state, case_id, proposal_id, decision).await?;
    Ok(Json(ResumeResponse { success: true, message: "Adjustment queued".to_string(), job_id }))
}

pub async fn dismiss(
    State(state): State<AppState>,
    Path((case_id, proposal_id)): Path<(CaseId, ProposalId)>,
) -> ApiResult<Json<ResumeResponse>> {
    let decision = HumanDecision { action: HumanDecisionAction::Dismiss, instruction: None };
    let job_id = enqueue_decision(&state, case_id, proposal_id, decision).await?;
    Ok(Json(ResumeResponse { success: true, message: "Dismissal queued".to_string(), job_id }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Path((case_id, proposal_id)): Path<(CaseId, ProposalId)>,
) -> ApiResult<Json<ResumeResponse>> {
    let decision = HumanDecision { action: HumanDecisionAction::Withdraw, instruction: None };
    let job_id = enqueue_decision(&state, case_id, proposal_id, decision).await?;
    Ok(Json(ResumeResponse { success: true, message: "Withdrawal queued".to_string(), job_id }))
}
