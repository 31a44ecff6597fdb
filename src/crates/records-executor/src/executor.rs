//! The executor: claims a proposal's `execution_key` and performs
//! exactly one side effect per claim (spec.md §4.6).
//!
//! Every entry point is safe to call twice for the same proposal: the
//! claim is a compare-and-set, so a retried call after a crash either
//! finds the row already `EXECUTED` (no-op) or wins the claim and
//! proceeds normally.

use std::sync::Arc;

use chrono::Utc;
use records_core::{ActionType, Case, Channel, ExecutionRecord, ExecutionRecordId, ExecutionStatus, Proposal};
use records_store::Store;
use tracing::{info, warn};

use crate::error::{ExecutorError, Result};
use crate::gateway::OutboundGateway;

/// What happened when a proposal was handed to [`Executor::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// A new execution was claimed and carried out.
    Executed { channel: Channel },
    /// Another caller already claimed (or finished) this proposal; this
    /// call was a no-op.
    AlreadyClaimed,
    /// The proposal targets a portal-only agency: a `PortalTask` was
    /// created instead of sending email.
    PortalTaskCreated,
}

pub struct Executor {
    store: Arc<dyn Store>,
    gateway: Arc<dyn OutboundGateway>,
    followup_delay_days: u32,
}

impl Executor {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn OutboundGateway>, followup_delay_days: u32) -> Self {
        Self {
            store,
            gateway,
            followup_delay_days,
        }
    }

    /// Executes `proposal_id`'s approved action, or returns
    /// `AlreadyClaimed` if it has already been executed or is being
    /// executed by a concurrent caller.
    pub async fn execute(&self, proposal_id: records_core::ProposalId) -> Result<ExecutionOutcome> {
        let proposal = self.store.get_proposal(proposal_id).await?;
        if proposal.is_locked() {
            return Ok(ExecutionOutcome::AlreadyClaimed);
        }

        let execution_key = Proposal::make_execution_key(&proposal.proposal_key);
        let claimed = self
            .store
            .claim_proposal_execution(proposal_id, &execution_key)
            .await?;
        if !claimed {
            info!(%proposal_id, "execution already claimed by another caller");
            return Ok(ExecutionOutcome::AlreadyClaimed);
        }

        let case = self.store.get_case(proposal.case_id).await?;
        let outcome = self.dispatch(&proposal, &case, &execution_key).await;

        match &outcome {
            Ok(_) => {}
            Err(err) => warn!(%proposal_id, error = %err, "execution dispatch failed after claim"),
        }
        outcome
    }

    async fn dispatch(&self, proposal: &Proposal, case: &Case, execution_key: &str) -> Result<ExecutionOutcome> {
        match proposal.action_type {
            ActionType::Escalate => self.dispatch_escalation(proposal, case, execution_key).await,
            action if action.is_send_action() => {
                if case.agency.is_portal_only() {
                    self.dispatch_portal(proposal, execution_key).await
                } else {
                    self.dispatch_email(proposal, case, execution_key).await
                }
            }
            _ => self.dispatch_internal(proposal, execution_key).await,
        }
    }

    async fn dispatch_email(&self, proposal: &Proposal, case: &Case, execution_key: &str) -> Result<ExecutionOutcome> {
        let to = case
            .agency
            .email
            .clone()
            .ok_or_else(|| ExecutorError::MissingAgencyEmail(proposal.id))?;

        let job = records_queue::EmailJob {
            job_id: execution_key.to_string(),
            case_id: case.id,
            proposal_id: proposal.id,
            to,
            subject: proposal.draft.subject.clone(),
            body_text: proposal.draft.body_text.clone(),
            body_html: proposal.draft.body_html.clone(),
            deliver_after: Utc::now(),
        };
        if job.subject.is_empty() && job.body_text.is_empty() {
            return Err(ExecutorError::MissingDraft(proposal.id));
        }

        self.gateway.enqueue_email(job).await?;

        let now = Utc::now();
        self.store
            .mark_proposal_executed(proposal.id, Some(execution_key.to_string()), now)
            .await?;

        self.store
            .create_execution_record(ExecutionRecord {
                id: ExecutionRecordId(0),
                proposal_id: proposal.id,
                execution_key: execution_key.to_string(),
                action_type: proposal.action_type,
                channel: Channel::Email,
                status: ExecutionStatus::Succeeded,
                created_at: now,
                detail: None,
            })
            .await?;

        let mut case = case.clone();
        case.status = records_core::CaseStatus::AwaitingResponse;
        case.updated_at = now;
        self.store.save_case(&case).await?;

        if matches!(proposal.action_type, ActionType::SendInitialRequest | ActionType::SendFollowup) {
            let next = Some(now + chrono::Duration::days(self.followup_delay_days as i64));
            self.store.upsert_followup_schedule(case.id, now, next).await?;
        }

        info!(proposal_id = %proposal.id, "executed send action");
        Ok(ExecutionOutcome::Executed { channel: Channel::Email })
    }

    async fn dispatch_portal(&self, proposal: &Proposal, execution_key: &str) -> Result<ExecutionOutcome> {
        self.store.create_portal_task(proposal.case_id, proposal.id).await?;

        let now = Utc::now();
        self.store
            .mark_proposal_executed(proposal.id, None, now)
            .await?;
        self.store
            .create_execution_record(ExecutionRecord {
                id: ExecutionRecordId(0),
                proposal_id: proposal.id,
                execution_key: execution_key.to_string(),
                action_type: proposal.action_type,
                channel: Channel::Portal,
                status: ExecutionStatus::Succeeded,
                created_at: now,
                detail: Some("portal submission queued for manual completion".to_string()),
            })
            .await?;

        info!(proposal_id = %proposal.id, "created portal task for manual submission");
        Ok(ExecutionOutcome::PortalTaskCreated)
    }

    async fn dispatch_escalation(&self, proposal: &Proposal, case: &Case, execution_key: &str) -> Result<ExecutionOutcome> {
        let reason = proposal
            .reasoning
            .last()
            .cloned()
            .unwrap_or_else(|| "escalation requested".to_string());
        let (_escalation, was_inserted) = self
            .store
            .upsert_escalation(case.id, &reason, "normal", None)
            .await?;

        if was_inserted {
            self.gateway.notify_escalation(case.id, &reason, "normal").await?;
        }

        let now = Utc::now();
        self.store
            .mark_proposal_executed(proposal.id, None, now)
            .await?;
        self.store
            .create_execution_record(ExecutionRecord {
                id: ExecutionRecordId(0),
                proposal_id: proposal.id,
                execution_key: execution_key.to_string(),
                action_type: proposal.action_type,
                channel: Channel::None,
                status: ExecutionStatus::Succeeded,
                created_at: now,
                detail: None,
            })
            .await?;

        let mut case = case.clone();
        case.status = records_core::CaseStatus::Escalated;
        case.updated_at = now;
        self.store.save_case(&case).await?;

        info!(proposal_id = %proposal.id, new_escalation = was_inserted, "escalation dispatched");
        Ok(ExecutionOutcome::Executed { channel: Channel::None })
    }

    async fn dispatch_internal(&self, proposal: &Proposal, execution_key: &str) -> Result<ExecutionOutcome> {
        let now = Utc::now();
        self.store
            .mark_proposal_executed(proposal.id, None, now)
            .await?;
        self.store
            .create_execution_record(ExecutionRecord {
                id: ExecutionRecordId(0),
                proposal_id: proposal.id,
                execution_key: execution_key.to_string(),
                action_type: proposal.action_type,
                channel: Channel::None,
                status: ExecutionStatus::Succeeded,
                created_at: now,
                detail: None,
            })
            .await?;

        if proposal.action_type == ActionType::CloseCase {
            let mut case = self.store.get_case(proposal.case_id).await?;
            case.status = records_core::CaseStatus::Completed;
            case.updated_at = now;
            self.store.save_case(&case).await?;
        }

        info!(proposal_id = %proposal.id, action = ?proposal.action_type, "executed internal action");
        Ok(ExecutionOutcome::Executed { channel: Channel::None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::DryGateway;
    use records_store::{InMemoryStore, ProposalUpsert};
    use std::collections::BTreeSet;

    fn sample_case() -> Case {
        Case {
            id: records_core::CaseId(1),
            agency: records_core::AgencyIdentity {
                name: "City PD".into(),
                email: Some("records@citypd.example".into()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".into(),
            status: records_core::CaseStatus::AwaitingResponse,
            substatus: None,
            pause_reason: None,
            constraints: BTreeSet::new(),
            scope_items: vec![],
            next_due_at: None,
            autopilot_mode: records_core::AutopilotMode::Auto,
            portal: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn store_with_case() -> (Arc<InMemoryStore>, Case) {
        let store = Arc::new(InMemoryStore::new());
        let case = sample_case();
        store.save_case(&case).await.unwrap();
        (store, case)
    }

    #[tokio::test]
    async fn executing_twice_is_idempotent() {
        let (store, case) = store_with_case().await;
        let run = records_core::AgentRun::new(
            records_core::RunId(0),
            case.id,
            records_core::TriggerType::InitialRequest,
            Utc::now(),
        );
        let run = store.create_run(run).await.unwrap();

        let proposal = store
            .upsert_proposal(ProposalUpsert {
                case_id: case.id,
                run_id: run.id,
                trigger_message_id: None,
                action_type: ActionType::SendInitialRequest,
                draft: records_core::Draft {
                    subject: "Records Request".into(),
                    body_text: "please send records".into(),
                    body_html: "<p>please send records</p>".into(),
                },
                reasoning: vec!["auto".into()],
                confidence: 1.0,
                risk_flags: vec![],
                warnings: vec![],
                can_auto_execute: true,
                requires_human: false,
                status: records_core::ProposalStatus::Approved,
                proposal_key: "1:scheduled:SendInitialRequest:0".into(),
                adjustment_count: 0,
            })
            .await
            .unwrap();

        let executor = Executor::new(store.clone(), Arc::new(DryGateway), 7);
        let first = executor.execute(proposal.id).await.unwrap();
        assert!(matches!(first, ExecutionOutcome::Executed { channel: Channel::Email }));

        let second = executor.execute(proposal.id).await.unwrap();
        assert_eq!(second, ExecutionOutcome::AlreadyClaimed);
    }

    #[tokio::test]
    async fn portal_only_agency_creates_portal_task_not_email() {
        let store = Arc::new(InMemoryStore::new());
        let mut case = sample_case();
        case.agency.portal_url = Some("https://portal.example".into());
        case.agency.portal_provider = Some("nextrequest".into());
        store.save_case(&case).await.unwrap();

        let run = store
            .create_run(records_core::AgentRun::new(
                records_core::RunId(0),
                case.id,
                records_core::TriggerType::InitialRequest,
                Utc::now(),
            ))
            .await
            .unwrap();

        let proposal = store
            .upsert_proposal(ProposalUpsert {
                case_id: case.id,
                run_id: run.id,
                trigger_message_id: None,
                action_type: ActionType::SendInitialRequest,
                draft: records_core::Draft {
                    subject: "Records Request".into(),
                    body_text: "please send records".into(),
                    body_html: "<p>please send records</p>".into(),
                },
                reasoning: vec![],
                confidence: 1.0,
                risk_flags: vec![],
                warnings: vec![],
                can_auto_execute: true,
                requires_human: false,
                status: records_core::ProposalStatus::Approved,
                proposal_key: "1:scheduled:SendInitialRequest:0".into(),
                adjustment_count: 0,
            })
            .await
            .unwrap();

        let executor = Executor::new(store, Arc::new(DryGateway), 7);
        let outcome = executor.execute(proposal.id).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::PortalTaskCreated);
    }
}
