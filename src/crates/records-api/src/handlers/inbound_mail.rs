//! `POST /webhooks/inbound-mail` — resolves the case a reply belongs to,
//! ingests the message, and queues a `run_on_inbound` job (spec.md §6).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use records_core::{Direction, Message, MessageId};
use records_queue::AgentJob;

use crate::error::{ApiError, ApiResult};
use crate::models::{InboundMailPayload, InboundMailResponse};
use crate::routes::AppState;

pub async fn receive(
    State(state): State<AppState>,
    Json(payload): Json<InboundMailPayload>,
) -> ApiResult<Json<InboundMailResponse>> {
    let case_id = match &payload.in_reply_to {
        Some(rfc2822_id) => state.store.find_case_id_by_rfc2822_id(rfc2822_id).await?,
        None => None,
    };
    let case_id = match case_id {
        Some(id) => id,
        None => state
            .store
            .find_case_id_by_agency_email(&payload.from_email)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "no case matches sender {} or In-Reply-To header",
                    payload.from_email
                ))
            })?,
    };

    let message = Message {
        id: MessageId(0),
        case_id,
        direction: Direction::Inbound,
        provider_message_id: payload.provider_message_id,
        rfc2822_id: None,
        subject: payload.subject,
        body_text: payload.body_text,
        body_html: payload.body_html,
        message_type: None,
        sent_at: None,
        received_at: Some(Utc::now()),
        processed_at: None,
        processed_run_id: None,
        last_error: None,
    };
    let saved = state.store.ingest_inbound_message(message).await?;

    let job_id = format!("inbound:{case_id}:{}", saved.id);
    let job = AgentJob::RunOnInbound { case_id, message_id: saved.id };
    state.agent_queue.enqueue(job_id.clone(), job).await?;

    Ok(Json(InboundMailResponse {
        success: true,
        case_id: case_id.0,
        message_id: saved.id.0,
        job_id,
    }))
}
