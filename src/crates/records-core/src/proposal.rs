//! `Proposal` — a single proposed next action, with its draft.

use crate::enums::{ActionType, HumanDecisionAction, ProposalStatus, RiskFlag};
use crate::ids::{CaseId, MessageId, ProposalId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The drafted outbound content for a proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
}

/// A human's decision on a gated proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanDecision {
    pub action: HumanDecisionAction,
    /// Present only when `action` is `ADJUST`.
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
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
    pub execution_key: Option<String>,
    pub email_job_id: Option<String>,
    pub adjustment_count: i32,
    pub human_decision: Option<HumanDecision>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// `proposal_key = case_id : (trigger_message_id | 'scheduled') :
    /// action_type : adjustment_count`. A pure function of its inputs,
    /// never random, so repeated graph runs with the same inputs produce
    /// the same key.
    pub fn make_key(
        case_id: CaseId,
        trigger_message_id: Option<MessageId>,
        action_type: ActionType,
        adjustment_count: i32,
    ) -> String {
        let trigger = trigger_message_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "scheduled".to_string());
        format!("{case_id}:{trigger}:{action_type:?}:{adjustment_count}")
    }

    /// The deterministic execution key claimed by the store's CAS and
    /// reused as the outbound queue's job ID. Derived from the proposal
    /// key so an ADJUST-triggered redraft, which bumps `adjustment_count`
    /// and thus the proposal key, never collides with the key of the
    /// proposal it superseded.
    pub fn make_execution_key(proposal_key: &str) -> String {
        format!("exec:{proposal_key}")
    }

    /// Once a proposal reaches `EXECUTED`, nothing may change its status
    /// or `email_job_id` again. Exposed here so the store can express the
    /// rule as one call instead of duplicating the check.
    pub fn is_locked(&self) -> bool {
        self.status == ProposalStatus::Executed
    }
}
