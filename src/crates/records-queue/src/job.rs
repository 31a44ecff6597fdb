//! The three job envelopes the Queue Bridge carries (spec.md §2, §6),
//! modeled after the original BullMQ `agentQueue` job-name/payload pairs
//! in `ADD TO EXISTING email-queue.js`.

use chrono::{DateTime, Utc};
use records_core::{CaseId, HumanDecision, MessageId, ProposalId};
use serde::{Deserialize, Serialize};

/// A job handed to the case-graph worker. Each variant maps one-to-one to
/// a `TriggerType` the Supervisor dispatches into `invoke`/`resume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentJob {
    RunOnInbound { case_id: CaseId, message_id: MessageId },
    RunOnSchedule { case_id: CaseId },
    ResumeFromHuman {
        case_id: CaseId,
        proposal_id: ProposalId,
        human_decision: HumanDecision,
    },
}

impl AgentJob {
    pub fn case_id(&self) -> CaseId {
        match self {
            Self::RunOnInbound { case_id, .. } => *case_id,
            Self::RunOnSchedule { case_id } => *case_id,
            Self::ResumeFromHuman { case_id, .. } => *case_id,
        }
    }
}

/// An outbound mail send, dispatched by the Executor and delivered by a
/// mail-provider worker. `job_id` doubles as the dedup key: it is always
/// the proposal's `execution_key` (spec.md §4.6), so retries of the same
/// execution never produce a second send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub job_id: String,
    pub case_id: CaseId,
    pub proposal_id: ProposalId,
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    /// The human-like delay applied before the mail provider worker is
    /// allowed to actually dispatch this job (spec.md §4.6).
    pub deliver_after: DateTime<Utc>,
}
