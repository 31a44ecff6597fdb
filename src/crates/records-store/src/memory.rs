//! In-memory reference [`Store`] implementation.
//!
//! Mirrors the teacher's `InMemoryCheckpointSaver` shape: a single
//! `Mutex`-guarded struct holding every table as a `HashMap`, sufficient for
//! unit tests and for running the whole engine in a process without a
//! database. Every contract in `traits.rs` — the upsert-proposal
//! idempotence rule, the claim CAS, the escalation dedup window — is
//! enforced here exactly as a Postgres backend would enforce it with SQL.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use records_core::*;

use crate::error::{Result, StoreError};
use crate::traits::{ProposalUpsert, Store};

#[derive(Default)]
struct Tables {
    cases: HashMap<CaseId, Case>,
    messages: HashMap<MessageId, Message>,
    next_message_id: i64,
    analyses: HashMap<CaseId, ResponseAnalysis>,
    proposals: HashMap<ProposalId, Proposal>,
    proposal_keys: HashMap<String, ProposalId>,
    next_proposal_id: i64,
    runs: HashMap<RunId, AgentRun>,
    next_run_id: i64,
    followups: HashMap<CaseId, FollowUpSchedule>,
    escalations: HashMap<(CaseId, String), Escalation>,
    next_escalation_id: i64,
    portal_tasks: HashMap<PortalTaskId, PortalTask>,
    next_portal_task_id: i64,
    execution_records: HashMap<ExecutionRecordId, ExecutionRecord>,
    next_execution_record_id: i64,
    traces: HashMap<DecisionTraceId, DecisionTrace>,
    next_trace_id: i64,
    locked_cases: HashSet<CaseId>,
}

/// An in-memory [`Store`]. Cheap to construct (`Store::default()`); clone
/// the handle (it is an `Arc`-free plain struct, so wrap in `Arc` at the
/// call site) to share across tasks.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a case directly, bypassing the (external) Notion importer this
    /// engine treats as a collaborator. Test/bootstrap helper.
    pub fn seed_case(&self, case: Case) {
        self.tables.lock().unwrap().cases.insert(case.id, case);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_case(&self, case_id: CaseId) -> Result<Case> {
        self.tables
            .lock()
            .unwrap()
            .cases
            .get(&case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("case {case_id}")))
    }

    async fn save_case(&self, case: &Case) -> Result<()> {
        let mut case = case.clone();
        case.updated_at = Utc::now();
        self.tables.lock().unwrap().cases.insert(case.id, case);
        Ok(())
    }

    async fn get_message(&self, message_id: MessageId) -> Result<Message> {
        self.tables
            .lock()
            .unwrap()
            .messages
            .get(&message_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))
    }

    async fn list_messages(&self, case_id: CaseId, limit: usize) -> Result<Vec<Message>> {
        let tables = self.tables.lock().unwrap();
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.case_id == case_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.received_at.or(m.sent_at));
        if messages.len() > limit {
            let start = messages.len() - limit;
            messages = messages.split_off(start);
        }
        Ok(messages)
    }

    async fn ingest_inbound_message(&self, mut message: Message) -> Result<Message> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(provider_id) = message.provider_message_id.clone() {
            if let Some(existing) = tables
                .messages
                .values()
                .find(|m| m.case_id == message.case_id && m.provider_message_id.as_deref() == Some(provider_id.as_str()))
                .cloned()
            {
                return Ok(existing);
            }
        }
        tables.next_message_id += 1;
        message.id = MessageId(tables.next_message_id);
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn save_outbound_message(&self, mut message: Message) -> Result<Message> {
        let mut tables = self.tables.lock().unwrap();
        if message.id.0 == 0 {
            tables.next_message_id += 1;
            message.id = MessageId(tables.next_message_id);
        }
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn mark_message_processed(
        &self,
        message_id: MessageId,
        run_id: RunId,
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let message = tables
            .messages
            .get_mut(&message_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))?;
        if message.processed_run_id.is_none() {
            message.processed_run_id = Some(run_id);
            message.processed_at = Some(processed_at);
        }
        Ok(())
    }

    async fn save_analysis(&self, analysis: &ResponseAnalysis) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let case_id = tables
            .messages
            .get(&analysis.message_id)
            .map(|m| m.case_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {}", analysis.message_id)))?;
        tables.analyses.insert(case_id, analysis.clone());
        Ok(())
    }

    async fn get_latest_analysis(&self, case_id: CaseId) -> Result<Option<ResponseAnalysis>> {
        Ok(self.tables.lock().unwrap().analyses.get(&case_id).cloned())
    }

    async fn upsert_proposal(&self, fields: ProposalUpsert) -> Result<Proposal> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(&existing_id) = tables.proposal_keys.get(&fields.proposal_key) {
            let existing = tables.proposals.get(&existing_id).cloned().unwrap();
            if existing.is_locked() {
                // EXECUTED rows are immutable except via mark_proposal_executed.
                return Ok(existing);
            }
            let updated = Proposal {
                action_type: fields.action_type,
                draft: fields.draft,
                reasoning: fields.reasoning,
                confidence: fields.confidence,
                risk_flags: fields.risk_flags,
                warnings: fields.warnings,
                can_auto_execute: fields.can_auto_execute,
                requires_human: fields.requires_human,
                status: fields.status,
                adjustment_count: fields.adjustment_count,
                ..existing
            };
            tables.proposals.insert(existing_id, updated.clone());
            return Ok(updated);
        }
        tables.next_proposal_id += 1;
        let id = ProposalId(tables.next_proposal_id);
        let proposal = Proposal {
            id,
            case_id: fields.case_id,
            run_id: fields.run_id,
            trigger_message_id: fields.trigger_message_id,
            action_type: fields.action_type,
            draft: fields.draft,
            reasoning: fields.reasoning,
            confidence: fields.confidence,
            risk_flags: fields.risk_flags,
            warnings: fields.warnings,
            can_auto_execute: fields.can_auto_execute,
            requires_human: fields.requires_human,
            status: fields.status,
            proposal_key: fields.proposal_key.clone(),
            execution_key: None,
            email_job_id: None,
            adjustment_count: fields.adjustment_count,
            human_decision: None,
            executed_at: None,
        };
        tables.proposal_keys.insert(fields.proposal_key, id);
        tables.proposals.insert(id, proposal.clone());
        Ok(proposal)
    }

    async fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal> {
        self.tables
            .lock()
            .unwrap()
            .proposals
            .get(&proposal_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))
    }

    async fn get_latest_pending_proposal(&self, case_id: CaseId) -> Result<Option<Proposal>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .proposals
            .values()
            .filter(|p| {
                p.case_id == case_id
                    && matches!(
                        p.status,
                        ProposalStatus::PendingApproval | ProposalStatus::Approved
                    )
            })
            .max_by_key(|p| p.id.0)
            .cloned())
    }

    async fn claim_proposal_execution(
        &self,
        proposal_id: ProposalId,
        execution_key: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(&proposal_id)
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))?;
        if proposal.execution_key.is_some() || proposal.status == ProposalStatus::Executed {
            return Ok(false);
        }
        proposal.execution_key = Some(execution_key.to_string());
        Ok(true)
    }

    async fn mark_proposal_executed(
        &self,
        proposal_id: ProposalId,
        email_job_id: Option<String>,
        executed_at: DateTime<Utc>,
    ) -> Result<Proposal> {
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(&proposal_id)
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))?;
        proposal.status = ProposalStatus::Executed;
        proposal.executed_at = Some(executed_at);
        if email_job_id.is_some() {
            proposal.email_job_id = email_job_id;
        }
        Ok(proposal.clone())
    }

    async fn set_proposal_human_decision(
        &self,
        proposal_id: ProposalId,
        decision: HumanDecision,
    ) -> Result<Proposal> {
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(&proposal_id)
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))?;
        proposal.human_decision = Some(decision);
        Ok(proposal.clone())
    }

    async fn set_proposal_status(&self, proposal_id: ProposalId, status: ProposalStatus) -> Result<Proposal> {
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(&proposal_id)
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))?;
        if proposal.status != ProposalStatus::Executed {
            proposal.status = status;
        }
        Ok(proposal.clone())
    }

    async fn count_dismissed_actions(
        &self,
        case_id: CaseId,
    ) -> Result<std::collections::HashMap<ActionType, i32>> {
        let tables = self.tables.lock().unwrap();
        let mut counts = std::collections::HashMap::new();
        for proposal in tables.proposals.values() {
            if proposal.case_id == case_id && proposal.status == ProposalStatus::Dismissed {
                *counts.entry(proposal.action_type).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn create_run(&self, mut run: AgentRun) -> Result<AgentRun> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_run_id += 1;
        run.id = RunId(tables.next_run_id);
        tables.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn save_run(&self, run: &AgentRun) -> Result<()> {
        self.tables.lock().unwrap().runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: RunId) -> Result<AgentRun> {
        self.tables
            .lock()
            .unwrap()
            .runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))
    }

    async fn has_active_run(&self, case_id: CaseId) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .runs
            .values()
            .any(|r| r.case_id == case_id && r.status.is_active()))
    }

    async fn get_followup_schedule(&self, case_id: CaseId) -> Result<Option<FollowUpSchedule>> {
        Ok(self.tables.lock().unwrap().followups.get(&case_id).cloned())
    }

    async fn upsert_followup_schedule(
        &self,
        case_id: CaseId,
        sent_at: DateTime<Utc>,
        next_followup_date: Option<DateTime<Utc>>,
    ) -> Result<FollowUpSchedule> {
        let mut tables = self.tables.lock().unwrap();
        let schedule = tables
            .followups
            .entry(case_id)
            .or_insert_with(|| FollowUpSchedule::new(case_id));
        schedule.increment(sent_at, next_followup_date);
        Ok(schedule.clone())
    }

    async fn upsert_escalation(
        &self,
        case_id: CaseId,
        reason: &str,
        urgency: &str,
        suggested_action: Option<String>,
    ) -> Result<(Escalation, bool)> {
        let mut tables = self.tables.lock().unwrap();
        let key = (case_id, reason.to_string());
        if let Some(existing) = tables.escalations.get(&key) {
            let age = Utc::now() - existing.created_at;
            if age.num_seconds() < ESCALATION_DEDUP_WINDOW_SECS {
                return Ok((existing.clone(), false));
            }
        }
        tables.next_escalation_id += 1;
        let escalation = Escalation {
            id: EscalationId(tables.next_escalation_id),
            case_id,
            reason: reason.to_string(),
            urgency: urgency.to_string(),
            suggested_action,
            created_at: Utc::now(),
            notified: false,
        };
        tables.escalations.insert(key, escalation.clone());
        Ok((escalation, true))
    }

    async fn create_portal_task(&self, case_id: CaseId, proposal_id: ProposalId) -> Result<PortalTask> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_portal_task_id += 1;
        let now = Utc::now();
        let task = PortalTask {
            id: PortalTaskId(tables.next_portal_task_id),
            case_id,
            proposal_id,
            status: PortalTaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.portal_tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn create_execution_record(&self, mut record: ExecutionRecord) -> Result<ExecutionRecord> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_execution_record_id += 1;
        record.id = ExecutionRecordId(tables.next_execution_record_id);
        tables.execution_records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save_decision_trace(&self, mut trace: DecisionTrace) -> Result<DecisionTrace> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_trace_id += 1;
        trace.id = DecisionTraceId(tables.next_trace_id);
        tables.traces.insert(trace.id, trace.clone());
        Ok(trace)
    }

    async fn acquire_case_lock(&self, case_id: CaseId) -> Result<bool> {
        Ok(self.tables.lock().unwrap().locked_cases.insert(case_id))
    }

    async fn release_case_lock(&self, case_id: CaseId) -> Result<()> {
        self.tables.lock().unwrap().locked_cases.remove(&case_id);
        Ok(())
    }

    async fn find_case_id_by_rfc2822_id(&self, rfc2822_id: &str) -> Result<Option<CaseId>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .messages
            .values()
            .find(|m| m.rfc2822_id.as_deref() == Some(rfc2822_id))
            .map(|m| m.case_id))
    }

    async fn find_case_id_by_agency_email(&self, email: &str) -> Result<Option<CaseId>> {
        let tables = self.tables.lock().unwrap();
        let email = email.to_lowercase();
        Ok(tables
            .cases
            .values()
            .find(|c| c.agency.email.as_deref().map(|e| e.to_lowercase()) == Some(email.clone()))
            .map(|c| c.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_case(id: i64) -> Case {
        Case {
            id: CaseId(id),
            agency: AgencyIdentity {
                name: "City PD".into(),
                email: Some("records@citypd.example".into()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".into(),
            status: CaseStatus::Sent,
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

    fn sample_upsert(case_id: CaseId, run_id: RunId, key: &str) -> ProposalUpsert {
        ProposalUpsert {
            case_id,
            run_id,
            trigger_message_id: None,
            action_type: ActionType::AcceptFee,
            draft: Draft::default(),
            reasoning: vec!["fee within threshold".into()],
            confidence: 0.9,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            can_auto_execute: true,
            requires_human: false,
            status: ProposalStatus::Draft,
            proposal_key: key.to_string(),
            adjustment_count: 0,
        }
    }

    #[tokio::test]
    async fn upsert_proposal_is_idempotent_by_key() {
        let store = InMemoryStore::new();
        store.seed_case(sample_case(1));
        let run = store
            .create_run(AgentRun::new(RunId(0), CaseId(1), TriggerType::InboundMessage, Utc::now()))
            .await
            .unwrap();

        let p1 = store
            .upsert_proposal(sample_upsert(CaseId(1), run.id, "1:scheduled:ACCEPT_FEE:0"))
            .await
            .unwrap();
        let p2 = store
            .upsert_proposal(sample_upsert(CaseId(1), run.id, "1:scheduled:ACCEPT_FEE:0"))
            .await
            .unwrap();
        assert_eq!(p1.id, p2.id);
    }

    #[tokio::test]
    async fn upsert_proposal_never_regresses_executed_status() {
        let store = InMemoryStore::new();
        store.seed_case(sample_case(1));
        let run = store
            .create_run(AgentRun::new(RunId(0), CaseId(1), TriggerType::InboundMessage, Utc::now()))
            .await
            .unwrap();
        let key = "1:scheduled:ACCEPT_FEE:0";
        let proposal = store
            .upsert_proposal(sample_upsert(CaseId(1), run.id, key))
            .await
            .unwrap();
        assert!(store
            .claim_proposal_execution(proposal.id, "exec:1")
            .await
            .unwrap());
        store
            .mark_proposal_executed(proposal.id, Some("job-1".into()), Utc::now())
            .await
            .unwrap();

        let mut retry = sample_upsert(CaseId(1), run.id, key);
        retry.status = ProposalStatus::PendingApproval;
        let result = store.upsert_proposal(retry).await.unwrap();
        assert_eq!(result.status, ProposalStatus::Executed);
        assert_eq!(result.email_job_id.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn claim_proposal_execution_is_a_single_winner_cas() {
        let store = InMemoryStore::new();
        store.seed_case(sample_case(1));
        let run = store
            .create_run(AgentRun::new(RunId(0), CaseId(1), TriggerType::InboundMessage, Utc::now()))
            .await
            .unwrap();
        let proposal = store
            .upsert_proposal(sample_upsert(CaseId(1), run.id, "1:scheduled:ACCEPT_FEE:0"))
            .await
            .unwrap();

        assert!(store
            .claim_proposal_execution(proposal.id, "exec:1")
            .await
            .unwrap());
        assert!(!store
            .claim_proposal_execution(proposal.id, "exec:1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn escalation_is_deduped_within_window() {
        let store = InMemoryStore::new();
        store.seed_case(sample_case(1));
        let (_, inserted1) = store
            .upsert_escalation(CaseId(1), "HOSTILE", "high", None)
            .await
            .unwrap();
        let (_, inserted2) = store
            .upsert_escalation(CaseId(1), "HOSTILE", "high", None)
            .await
            .unwrap();
        assert!(inserted1);
        assert!(!inserted2);
    }

    #[tokio::test]
    async fn case_lock_is_exclusive() {
        let store = InMemoryStore::new();
        assert!(store.acquire_case_lock(CaseId(1)).await.unwrap());
        assert!(!store.acquire_case_lock(CaseId(1)).await.unwrap());
        store.release_case_lock(CaseId(1)).await.unwrap();
        assert!(store.acquire_case_lock(CaseId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn followup_count_only_increases() {
        let store = InMemoryStore::new();
        store.seed_case(sample_case(1));
        let s1 = store
            .upsert_followup_schedule(CaseId(1), Utc::now(), None)
            .await
            .unwrap();
        let s2 = store
            .upsert_followup_schedule(CaseId(1), Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(s1.followup_count, 1);
        assert_eq!(s2.followup_count, 2);
    }
}
