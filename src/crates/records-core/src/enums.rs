//! Closed enumerations for case status, classification, and action types.
//!
//! Every classification and action type is a closed Rust enum, never a
//! free-form string. Deserializing an unrecognized value from the LLM
//! interface is handled in `records-llm`, not here — this module only
//! defines the closed set.

use serde::{Deserialize, Serialize};

/// Direction of a `Message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Case lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    ReadyToSend,
    Sent,
    AwaitingResponse,
    NeedsHumanReview,
    PortalInProgress,
    Completed,
    Cancelled,
    Escalated,
}

impl CaseStatus {
    /// `completed` and `cancelled` are terminal; nothing transitions a case
    /// out of them automatically.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// How much autonomy the engine has for a given case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutopilotMode {
    Auto,
    Supervised,
    Manual,
}

/// Status of one requested record kind within a case's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScopeItemStatus {
    Pending,
    Exempt,
    Denied,
    Delivered,
    Partial,
}

/// The closed classification set produced by `ResponseAnalysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    FeeQuote,
    Denial,
    Acknowledgment,
    RecordsReady,
    ClarificationRequest,
    PartialApproval,
    PartialDelivery,
    PortalRedirect,
    WrongAgency,
    Hostile,
    NoResponse,
    Unknown,
}

/// Subtype of a `DENIAL` classification, used by the router's denial-subtype
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialSubtype {
    OverlyBroad,
    GlomarNcnd,
    OngoingInvestigation,
    JuvenileRecords,
    SealedCourtOrder,
    Other,
}

/// Sentiment of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Hostile,
}

/// The closed set of actions the router can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    SendInitialRequest,
    SendFollowup,
    SendRebuttal,
    SendAppeal,
    SendClarification,
    SendFeeWaiverRequest,
    AcceptFee,
    NegotiateFee,
    DeclineFee,
    ReformulateRequest,
    ResearchAgency,
    SubmitPortal,
    RespondPartialApproval,
    CloseCase,
    Escalate,
    None,
}

impl ActionType {
    /// Whether this action, when executed, sends outbound correspondence
    /// (email or portal submission) as opposed to a purely internal status
    /// change. Used by the executor's portal guard.
    pub fn is_send_action(self) -> bool {
        matches!(
            self,
            Self::SendInitialRequest
                | Self::SendFollowup
                | Self::SendRebuttal
                | Self::SendAppeal
                | Self::SendClarification
                | Self::SendFeeWaiverRequest
                | Self::AcceptFee
                | Self::NegotiateFee
                | Self::DeclineFee
                | Self::ReformulateRequest
                | Self::RespondPartialApproval
        )
    }
}

/// Proposal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    PendingApproval,
    Approved,
    Executed,
    Superseded,
    Rejected,
    Dismissed,
    Blocked,
}

/// The user-facing category of why a run is awaiting a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseReason {
    FeeQuote,
    Scope,
    Denial,
    IdRequired,
    Sensitive,
    CloseAction,
}

/// Critical vs. warning safety flags raised by `safety_check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFlag {
    RequestsExemptItem,
    ContradictsFeeAcceptance,
    ReRequestsDeliveredItem,
    AggressiveLanguage,
    ContainsPii,
}

impl RiskFlag {
    /// Critical flags force gating regardless of autopilot mode; the rest
    /// are recorded as warnings only.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Self::RequestsExemptItem | Self::ContradictsFeeAcceptance | Self::ContainsPii
        )
    }
}

/// What kind of event triggered an `AgentRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    InitialRequest,
    InboundMessage,
    ScheduledFollowup,
    HumanResume,
    ManualReview,
}

/// `AgentRun` execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Queued,
    Running,
    PausedAwaitingHuman,
    Completed,
    Failed,
    SkippedLocked,
}

impl RunStatus {
    /// At most one run per case may sit in an active status at a time; this
    /// is the predicate the supervisor's lock check uses.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Queued | Self::Running | Self::PausedAwaitingHuman
        )
    }
}

/// The action a human takes on a gated proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumanDecisionAction {
    Approve,
    Adjust,
    Dismiss,
    Withdraw,
}

/// Status of a manual-submission work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalTaskStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

/// Which channel an `ExecutionRecord` went out over. A portal-only case
/// never produces a record with channel `email`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Portal,
    None,
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    InProgress,
}
