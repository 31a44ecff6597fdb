//! The `Store` trait: the sole authority for persistent state (spec.md §4.1).
//!
//! Every write the case graph makes goes through this trait. Two methods
//! carry the contracts the rest of the system leans on for correctness:
//! [`Store::upsert_proposal`] (idempotent upsert that never regresses an
//! `EXECUTED` row) and [`Store::claim_proposal_execution`] (the
//! compare-and-set that makes the executor idempotent).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use records_core::*;

use crate::error::Result;

/// Fields accepted by [`Store::upsert_proposal`]. Everything here may be
/// overwritten on a repeated upsert with the same `proposal_key`, except
/// when the existing row is already `EXECUTED` (§4.1).
#[derive(Debug, Clone)]
pub struct ProposalUpsert {
    pub case_id: CaseId,
    pub run_id: RunId,
    pub trigger_message_id: Option<MessageId>,
    pub action_type: ActionType,
    pub draft: Draft,
    pub reasoning: Vec<String>,
    pub confidence: f64,
    pub risk_flags: Vec<RiskFlag>,
    pub warnings: Vec<String>,
    pub can_auto_execute: bool,
    pub requires_human: bool,
    pub status: ProposalStatus,
    pub proposal_key: String,
    pub adjustment_count: i32,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- Case ---------------------------------------------------------
    async fn get_case(&self, case_id: CaseId) -> Result<Case>;
    async fn save_case(&self, case: &Case) -> Result<()>;

    // -- Message --------------------------------------------------------
    async fn get_message(&self, message_id: MessageId) -> Result<Message>;
    /// Returns the case's messages in `received_at`/`sent_at` order, oldest
    /// first, bounded to the most recent `limit` for context assembly.
    async fn list_messages(&self, case_id: CaseId, limit: usize) -> Result<Vec<Message>>;
    /// Inserts an inbound message, treating `provider_message_id` as a
    /// dedup key: if a message with the same id already exists for this
    /// case, returns the existing row instead of inserting a duplicate.
    async fn ingest_inbound_message(&self, message: Message) -> Result<Message>;
    async fn save_outbound_message(&self, message: Message) -> Result<Message>;
    async fn mark_message_processed(
        &self,
        message_id: MessageId,
        run_id: RunId,
        processed_at: DateTime<Utc>,
    ) -> Result<()>;

    // -- ResponseAnalysis -------------------------------------------------
    async fn save_analysis(&self, analysis: &ResponseAnalysis) -> Result<()>;
    async fn get_latest_analysis(&self, case_id: CaseId) -> Result<Option<ResponseAnalysis>>;

    // -- Proposal ---------------------------------------------------------
    /// Atomic upsert keyed on `proposal_key` (spec.md §4.1): if the existing
    /// row is already `EXECUTED`, its `status`/`execution_key`/`email_job_id`
    /// are preserved and every other field is refreshed; otherwise the row
    /// is replaced wholesale. Returns the final row.
    async fn upsert_proposal(&self, fields: ProposalUpsert) -> Result<Proposal>;
    async fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal>;
    async fn get_latest_pending_proposal(&self, case_id: CaseId) -> Result<Option<Proposal>>;
    /// Compare-and-set: succeeds iff `execution_key` is NULL and `status` is
    /// not `EXECUTED`. On success, sets `execution_key`.
    async fn claim_proposal_execution(
        &self,
        proposal_id: ProposalId,
        execution_key: &str,
    ) -> Result<bool>;
    async fn mark_proposal_executed(
        &self,
        proposal_id: ProposalId,
        email_job_id: Option<String>,
        executed_at: DateTime<Utc>,
    ) -> Result<Proposal>;
    async fn set_proposal_human_decision(
        &self,
        proposal_id: ProposalId,
        decision: HumanDecision,
    ) -> Result<Proposal>;
    /// Sets `status` directly, respecting the `EXECUTED` lock (spec.md
    /// §4.1): a proposal already `EXECUTED` is returned unchanged rather
    /// than regressed. Used by `decide_next_action`'s DISMISS/WITHDRAW
    /// handling, which has no draft to re-upsert through
    /// [`Store::upsert_proposal`].
    async fn set_proposal_status(&self, proposal_id: ProposalId, status: ProposalStatus) -> Result<Proposal>;
    async fn count_dismissed_actions(
        &self,
        case_id: CaseId,
    ) -> Result<std::collections::HashMap<ActionType, i32>>;

    // -- AgentRun -----------------------------------------------------------
    async fn create_run(&self, run: AgentRun) -> Result<AgentRun>;
    async fn save_run(&self, run: &AgentRun) -> Result<()>;
    async fn get_run(&self, run_id: RunId) -> Result<AgentRun>;
    /// Whether any run for this case currently sits in an active status
    /// (spec.md §3's `AgentRun` invariant). Used by the supervisor as a
    /// belt-and-braces check alongside the advisory lock.
    async fn has_active_run(&self, case_id: CaseId) -> Result<bool>;

    // -- FollowUpSchedule --------------------------------------------------
    async fn get_followup_schedule(&self, case_id: CaseId) -> Result<Option<FollowUpSchedule>>;
    /// Upserts the schedule, incrementing `followup_count` by exactly one.
    async fn upsert_followup_schedule(
        &self,
        case_id: CaseId,
        sent_at: DateTime<Utc>,
        next_followup_date: Option<DateTime<Utc>>,
    ) -> Result<FollowUpSchedule>;

    // -- Escalation -----------------------------------------------------------
    /// Insert-if-not-exists keyed on `(case_id, reason)` within the rolling
    /// dedup window. Returns the row and whether it was newly inserted;
    /// callers only notify an external channel when `was_inserted` is true.
    async fn upsert_escalation(
        &self,
        case_id: CaseId,
        reason: &str,
        urgency: &str,
        suggested_action: Option<String>,
    ) -> Result<(Escalation, bool)>;

    // -- PortalTask ------------------------------------------------------------
    async fn create_portal_task(&self, case_id: CaseId, proposal_id: ProposalId) -> Result<PortalTask>;

    // -- ExecutionRecord ----------------------------------------------------------
    async fn create_execution_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord>;

    // -- DecisionTrace --------------------------------------------------------------
    async fn save_decision_trace(&self, trace: DecisionTrace) -> Result<DecisionTrace>;

    // -- Advisory lock --------------------------------------------------------------
    /// Acquires the per-case advisory lock keyed on `hash("case:<id>")`.
    /// Non-blocking: returns `false` immediately if another holder has it.
    async fn acquire_case_lock(&self, case_id: CaseId) -> Result<bool>;
    async fn release_case_lock(&self, case_id: CaseId) -> Result<()>;

    // -- Inbound mail matching (spec.md §6 "Inbound mail webhook") -----------------
    /// Resolves a case from a prior outbound message's RFC 2822 `Message-ID`
    /// as referenced by an inbound reply's `In-Reply-To`/`References`
    /// headers.
    async fn find_case_id_by_rfc2822_id(&self, rfc2822_id: &str) -> Result<Option<CaseId>>;
    /// Resolves a case by the agency's email address, the webhook's
    /// fallback match when no threading header resolves.
    async fn find_case_id_by_agency_email(&self, email: &str) -> Result<Option<CaseId>>;
}
