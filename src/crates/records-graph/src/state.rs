//! `CaseState` — the value threaded through one run of the case graph.
//!
//! Spec.md §9 describes the original's cyclic/shared graph state as "an
//! immutable-per-step value type with an explicit reducer per field".
//! Since this graph is a fixed, strictly sequential pipeline (never a
//! concurrent Pregel step), the reducer is realized as a handful of named
//! append methods (`push_reasoning`, `push_error`, `push_trace`) rather
//! than a generic merge function: scalar fields are simply overwritten by
//! whichever node runs last, which is "last-write-wins" by construction
//! in a sequential pipeline, and the three list fields that must never
//! lose a prior write go through the append methods instead of direct
//! mutation.

use std::collections::HashMap;

use records_core::{
    ActionType, Case, Draft, HumanDecision, Message, PauseReason, ProposalId, ResponseAnalysis,
    RiskFlag, RunId, TriggerType,
};

/// Identifies which node a `Continue` outcome should run next, and which
/// node a run is currently suspended in or resuming into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeName {
    LoadContext,
    ClassifyInbound,
    UpdateConstraints,
    DecideNextAction,
    DraftResponse,
    SafetyCheck,
    GateOrExecute,
    ExecuteAction,
    CommitState,
}

impl NodeName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadContext => "load_context",
            Self::ClassifyInbound => "classify_inbound",
            Self::UpdateConstraints => "update_constraints",
            Self::DecideNextAction => "decide_next_action",
            Self::DraftResponse => "draft_response",
            Self::SafetyCheck => "safety_check",
            Self::GateOrExecute => "gate_or_execute",
            Self::ExecuteAction => "execute_action",
            Self::CommitState => "commit_state",
        }
    }
}

/// The payload yielded to the Supervisor when a run suspends inside
/// `gate_or_execute` (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InterruptPayload {
    #[serde(rename = "type")]
    pub interrupt_type: String,
    pub proposal_id: ProposalId,
    pub proposal_key: String,
    pub pause_reason: PauseReason,
    pub options: Vec<String>,
    pub summary: String,
}

impl InterruptPayload {
    pub fn human_approval(
        proposal_id: ProposalId,
        proposal_key: String,
        pause_reason: PauseReason,
        summary: String,
    ) -> Self {
        Self {
            interrupt_type: "HUMAN_APPROVAL".to_string(),
            proposal_id,
            proposal_key,
            pause_reason,
            options: vec![
                "APPROVE".to_string(),
                "ADJUST".to_string(),
                "DISMISS".to_string(),
                "WITHDRAW".to_string(),
            ],
            summary,
        }
    }
}

/// One node's result: keep going, suspend, or terminate the run.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    Continue(NodeName),
    Suspend(InterruptPayload),
    End(String),
}

/// The value threaded through every node of one run. Constructed once by
/// `load_context` and mutated in place by each subsequent node; persisted
/// to the checkpointer between nodes (§4.2) so a suspended run can resume
/// exactly where it left off.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaseState {
    pub run_id: RunId,
    pub case: Case,
    pub trigger_type: TriggerType,
    pub trigger_message_id: Option<records_core::MessageId>,
    pub recent_messages: Vec<Message>,
    pub analysis: Option<ResponseAnalysis>,
    pub dismissed_action_counts: HashMap<ActionType, i32>,

    pub proposal_action_type: Option<ActionType>,
    pub can_auto_execute: bool,
    pub requires_human: bool,
    pub pause_reason: Option<PauseReason>,

    pub draft: Option<Draft>,
    pub risk_flags: Vec<RiskFlag>,
    pub warnings: Vec<String>,
    pub adjustment_instruction: Option<String>,
    pub adjustment_count: i32,
    pub human_decision: Option<HumanDecision>,

    pub proposal_id: Option<ProposalId>,
    pub proposal_key: Option<String>,
    pub execution_outcome: Option<String>,

    /// Append-only: every node's contribution to the eventual
    /// `Proposal.reasoning` column.
    pub reasoning: Vec<String>,
    /// Append-only: a non-empty list at a terminal node fails the run
    /// (spec.md §7 "Propagation").
    pub errors: Vec<String>,
    /// Append-only: one entry per node entered, persisted onto the run's
    /// `DecisionTrace` at `commit_state`.
    pub node_trace: Vec<String>,

    pub iteration_count: u32,
}

impl CaseState {
    /// Builds the minimal state a fresh `invoke` starts from. Everything
    /// past `case`/`trigger_*` is populated by `load_context` and later
    /// nodes; `load_context` re-fetches the case itself so a stale `case`
    /// passed in here is never load-bearing.
    pub fn initial(
        run_id: RunId,
        case: Case,
        trigger_type: TriggerType,
        trigger_message_id: Option<records_core::MessageId>,
    ) -> Self {
        Self {
            run_id,
            case,
            trigger_type,
            trigger_message_id,
            recent_messages: Vec::new(),
            analysis: None,
            dismissed_action_counts: HashMap::new(),
            proposal_action_type: None,
            can_auto_execute: false,
            requires_human: false,
            pause_reason: None,
            draft: None,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            adjustment_instruction: None,
            adjustment_count: 0,
            human_decision: None,
            proposal_id: None,
            proposal_key: None,
            execution_outcome: None,
            reasoning: Vec::new(),
            errors: Vec::new(),
            node_trace: Vec::new(),
            iteration_count: 0,
        }
    }

    pub fn push_reasoning(&mut self, note: impl Into<String>) {
        self.reasoning.push(note.into());
    }

    pub fn push_error(&mut self, note: impl Into<String>) {
        self.errors.push(note.into());
    }

    pub fn push_trace(&mut self, node: NodeName) {
        self.node_trace.push(node.as_str().to_string());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
