//! Domain types shared across the case orchestration engine.
//!
//! Every entity in spec.md §3 lives here as a plain `serde`-able struct.
//! This crate performs no I/O and depends on nothing but `serde`/`chrono`,
//! so every other crate in the workspace can depend on it without pulling
//! in a database driver, an HTTP client, or an async runtime.

pub mod analysis;
pub mod case;
pub mod enums;
pub mod escalation;
pub mod execution;
pub mod followup;
pub mod ids;
pub mod message;
pub mod portal;
pub mod proposal;
pub mod run;
pub mod trace;

pub use analysis::ResponseAnalysis;
pub use case::{AgencyIdentity, Case, PortalBookkeeping, ScopeItem};
pub use enums::*;
pub use escalation::{Escalation, ESCALATION_DEDUP_WINDOW_SECS};
pub use execution::ExecutionRecord;
pub use followup::FollowUpSchedule;
pub use ids::{
    CaseId, DecisionTraceId, EscalationId, ExecutionRecordId, MessageId, PortalTaskId, ProposalId,
    RunId,
};
pub use message::Message;
pub use portal::PortalTask;
pub use proposal::{Draft, HumanDecision, Proposal};
pub use run::AgentRun;
pub use trace::DecisionTrace;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_case() -> Case {
        Case {
            id: CaseId(1),
            agency: AgencyIdentity {
                name: "City PD".into(),
                email: Some("records@citypd.example".into()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".into(),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            pause_reason: None,
            constraints: BTreeSet::new(),
            scope_items: vec![ScopeItem {
                item: "Body Camera Footage".into(),
                status: ScopeItemStatus::Pending,
                reason: None,
            }],
            next_due_at: None,
            autopilot_mode: AutopilotMode::Supervised,
            portal: PortalBookkeeping::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn merge_constraints_is_append_dedup() {
        let mut case = sample_case();
        assert!(case.merge_constraints(["BWC_EXEMPT".to_string()]));
        assert!(!case.merge_constraints(["BWC_EXEMPT".to_string()]));
        assert_eq!(case.constraints.len(), 1);
    }

    #[test]
    fn merge_scope_updates_is_case_insensitive_and_overwrites() {
        let mut case = sample_case();
        let changed = case.merge_scope_updates([ScopeItem {
            item: "body camera footage".into(),
            status: ScopeItemStatus::Exempt,
            reason: Some("privacy".into()),
        }]);
        assert!(changed);
        assert_eq!(case.scope_items.len(), 1);
        assert_eq!(case.scope_items[0].status, ScopeItemStatus::Exempt);
    }

    #[test]
    fn merge_scope_updates_appends_new_items() {
        let mut case = sample_case();
        case.merge_scope_updates([ScopeItem {
            item: "Dispatch Logs".into(),
            status: ScopeItemStatus::Pending,
            reason: None,
        }]);
        assert_eq!(case.scope_items.len(), 2);
    }

    #[test]
    fn proposal_key_is_deterministic() {
        let k1 = Proposal::make_key(CaseId(1), Some(MessageId(7)), ActionType::AcceptFee, 0);
        let k2 = Proposal::make_key(CaseId(1), Some(MessageId(7)), ActionType::AcceptFee, 0);
        assert_eq!(k1, k2);
        let k3 = Proposal::make_key(CaseId(1), None, ActionType::SendFollowup, 0);
        assert!(k3.contains("scheduled"));
    }

    #[test]
    fn proposal_key_changes_with_adjustment_count() {
        let k0 = Proposal::make_key(CaseId(1), Some(MessageId(7)), ActionType::AcceptFee, 0);
        let k1 = Proposal::make_key(CaseId(1), Some(MessageId(7)), ActionType::AcceptFee, 1);
        assert_ne!(k0, k1);
    }

    #[test]
    fn send_action_classification_matches_spec_table() {
        assert!(ActionType::SendFollowup.is_send_action());
        assert!(ActionType::AcceptFee.is_send_action());
        assert!(!ActionType::Escalate.is_send_action());
        assert!(!ActionType::SubmitPortal.is_send_action());
        assert!(!ActionType::None.is_send_action());
    }

    #[test]
    fn risk_flag_criticality_matches_spec_rules() {
        assert!(RiskFlag::RequestsExemptItem.is_critical());
        assert!(RiskFlag::ContradictsFeeAcceptance.is_critical());
        assert!(RiskFlag::ContainsPii.is_critical());
        assert!(!RiskFlag::ReRequestsDeliveredItem.is_critical());
        assert!(!RiskFlag::AggressiveLanguage.is_critical());
    }
}
