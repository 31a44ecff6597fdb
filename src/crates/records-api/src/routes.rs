//! Route table and shared application state.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use records_checkpoint::CheckpointSaver;
use records_queue::{AgentJob, JobQueue};
use records_store::Store;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// State shared across every handler. The API process only ever enqueues
/// jobs and reads state; it never invokes the case graph directly —
/// that happens in the worker process via `records-supervisor` (spec.md
/// §4.5's "workers call the supervisor").
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub checkpointer: Arc<dyn CheckpointSaver>,
    pub agent_queue: Arc<JobQueue<AgentJob>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/inbound-mail", post(handlers::inbound_mail::receive))
        .route(
            "/api/cases/:case_id/proposals/:proposal_id/approve",
            post(handlers::human_decision::approve),
        )
        .route(
            "/api/cases/:case_id/proposals/:proposal_id/adjust",
            post(handlers::human_decision::adjust),
        )
        .route(
            "/api/cases/:case_id/proposals/:proposal_id/dismiss",
            post(handlers::human_decision::dismiss),
        )
        .route(
            "/api/cases/:case_id/proposals/:proposal_id/withdraw",
            post(handlers::human_decision::withdraw),
        )
        .route("/api/cases/:case_id/agent-state", get(handlers::graph_state::get_agent_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use records_checkpoint::InMemoryCheckpointSaver;
    use records_core::{AgencyIdentity, AutopilotMode, Case, CaseId, CaseStatus, PortalBookkeeping};
    use records_queue::JobQueue;
    use records_store::InMemoryStore;
    use tower::ServiceExt;

    use super::*;

    fn sample_case() -> Case {
        Case {
            id: CaseId(1),
            agency: AgencyIdentity {
                name: "City PD".to_string(),
                email: Some("records@citypd.example".to_string()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".to_string(),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            pause_reason: None,
            constraints: BTreeSet::new(),
            scope_items: Vec::new(),
            next_due_at: None,
            autopilot_mode: AutopilotMode::Supervised,
            portal: PortalBookkeeping::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_state() -> AppState {
        let store = InMemoryStore::new();
        store.seed_case(sample_case());
        AppState {
            store: Arc::new(store),
            checkpointer: Arc::new(InMemoryCheckpointSaver::new()),
            agent_queue: JobQueue::new(3, 1),
        }
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn approve_enqueues_a_resume_job() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cases/1/proposals/7/approve")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adjust_without_instruction_is_bad_request() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cases/1/proposals/7/adjust")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"instruction\":\"\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn agent_state_without_a_checkpoint_is_not_found() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/cases/1/agent-state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
