//! The run supervisor (spec.md §4.5): the only caller of `CaseGraph`.
//! Owns the per-case advisory lock, `AgentRun` bookkeeping, and the
//! interrupt-vs-completion split on every invocation.

use std::sync::Arc;

use chrono::Utc;
use records_core::{AgentRun, CaseId, HumanDecision, MessageId, ProposalId, RunId, RunStatus, TriggerType};
use records_graph::{CaseGraph, InterruptPayload, RunOutcome};
use records_store::Store;
use tracing::{info, warn};

use crate::error::{Result, SupervisorError};

/// What one supervisor entry point produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorOutcome {
    Completed { run_id: RunId, reason: String },
    Suspended { run_id: RunId, payload: InterruptPayload },
    /// The case's advisory lock was already held; no run was started
    /// (spec.md §4.5 step 1).
    SkippedLocked,
}

/// Holds a case's advisory lock for the guard's lifetime and releases it on
/// drop, including on panic unwind (spec.md §4.5 step 6: release "on all
/// paths"). Release is fire-and-forget: it is spawned onto the runtime
/// rather than awaited, since `Drop::drop` cannot be async.
struct CaseLockGuard {
    store: Arc<dyn Store>,
    case_id: CaseId,
}

impl CaseLockGuard {
    fn new(store: Arc<dyn Store>, case_id: CaseId) -> Self {
        Self { store, case_id }
    }
}

impl Drop for CaseLockGuard {
    fn drop(&mut self) {
        let store = self.store.clone();
        let case_id = self.case_id;
        tokio::spawn(async move {
            if let Err(err) = store.release_case_lock(case_id).await {
                warn!(%case_id, error = %err, "failed to release case lock");
            }
        });
    }
}

pub struct Supervisor {
    store: Arc<dyn Store>,
    graph: Arc<CaseGraph>,
}

impl Supervisor {
    pub fn new(store: Arc<dyn Store>, graph: Arc<CaseGraph>) -> Self {
        Self { store, graph }
    }

    /// Starts a fresh run for `case_id` under `trigger_type`.
    pub async fn invoke(
        &self,
        case_id: CaseId,
        trigger_type: TriggerType,
        trigger_message_id: Option<MessageId>,
    ) -> Result<SupervisorOutcome> {
        if !self.store.acquire_case_lock(case_id).await? {
            warn!(%case_id, "case already locked, skipping run");
            let mut run = AgentRun::new(RunId(0), case_id, trigger_type, Utc::now());
            run.status = RunStatus::SkippedLocked;
            self.store.create_run(run).await?;
            return Ok(SupervisorOutcome::SkippedLocked);
        }
        let _lock = CaseLockGuard::new(self.store.clone(), case_id);

        self.invoke_locked(case_id, trigger_type, trigger_message_id).await
    }

    async fn invoke_locked(
        &self,
        case_id: CaseId,
        trigger_type: TriggerType,
        trigger_message_id: Option<MessageId>,
    ) -> Result<SupervisorOutcome> {
        let mut run = AgentRun::new(RunId(0), case_id, trigger_type, Utc::now());
        run.status = RunStatus::Running;
        let run = self.store.create_run(run).await?;

        let case = self.store.get_case(case_id).await?;
        let outcome = self
            .graph
            .invoke(run.id, case, trigger_type, trigger_message_id)
            .await;

        self.finish_run(run.id, outcome).await
    }

    /// Resumes a suspended run with `decision` for `proposal_id`.
    pub async fn resume(
        &self,
        case_id: CaseId,
        proposal_id: ProposalId,
        decision: HumanDecision,
    ) -> Result<SupervisorOutcome> {
        if !self.store.acquire_case_lock(case_id).await? {
            warn!(%case_id, "case already locked, skipping resume");
            return Ok(SupervisorOutcome::SkippedLocked);
        }
        let _lock = CaseLockGuard::new(self.store.clone(), case_id);

        let outcome = self.graph.resume(case_id, proposal_id, decision).await;
        match outcome {
            Ok((run_id, run_outcome)) => self.finish_run(run_id, Ok(run_outcome)).await,
            Err(err) => Err(SupervisorError::from(err)),
        }
    }

    async fn finish_run(
        &self,
        run_id: RunId,
        outcome: std::result::Result<RunOutcome, records_graph::GraphError>,
    ) -> Result<SupervisorOutcome> {
        let mut run = self.store.get_run(run_id).await?;
        run.ended_at = Some(Utc::now());

        let result = match outcome {
            Ok(RunOutcome::Completed(reason)) => {
                run.status = RunStatus::Completed;
                self.store.save_run(&run).await?;
                info!(run_id = %run_id, %reason, "run completed");
                Ok(SupervisorOutcome::Completed { run_id, reason })
            }
            Ok(RunOutcome::Suspended(payload)) => {
                run.status = RunStatus::PausedAwaitingHuman;
                self.store.save_run(&run).await?;
                info!(run_id = %run_id, "run paused awaiting human");
                Ok(SupervisorOutcome::Suspended { run_id, payload })
            }
            Err(err) => {
                run.status = RunStatus::Failed;
                run.error = Some(err.to_string());
                self.store.save_run(&run).await?;
                warn!(run_id = %run_id, error = %err, "run failed");
                Err(SupervisorError::from(err))
            }
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use records_config::Settings;
    use records_core::{AgencyIdentity, AutopilotMode, Case, CaseStatus, PortalBookkeeping};
    use records_executor::{DryGateway, Executor};
    use records_llm::MockProvider;
    use records_checkpoint::InMemoryCheckpointSaver;
    use records_store::InMemoryStore;
    use std::collections::BTreeSet;

    fn sample_case(id: CaseId) -> Case {
        Case {
            id,
            agency: AgencyIdentity {
                name: "City PD".into(),
                email: Some("records@citypd.example".into()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".into(),
            status: CaseStatus::ReadyToSend,
            substatus: None,
            pause_reason: None,
            constraints: BTreeSet::new(),
            scope_items: vec![],
            next_due_at: None,
            autopilot_mode: AutopilotMode::Manual,
            portal: PortalBookkeeping::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lock_guard_releases_on_drop_even_after_panic() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let case = sample_case(CaseId(5));
        store.save_case(&case).await.unwrap();
        assert!(store.acquire_case_lock(case.id).await.unwrap());

        let guarded_store = store.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _lock = CaseLockGuard::new(guarded_store, case.id);
            panic!("simulated node panic mid-run");
        }));
        assert!(outcome.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(store.acquire_case_lock(case.id).await.unwrap());
    }

    #[tokio::test]
    async fn skips_when_lock_already_held() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let case = sample_case(CaseId(1));
        store.save_case(&case).await.unwrap();
        store.acquire_case_lock(case.id).await.unwrap();

        let mock = Arc::new(MockProvider::default());
        let gateway = Arc::new(DryGateway);
        let executor = Arc::new(Executor::new(store.clone(), gateway, 7));
        let ctx = records_graph::GraphContext::new(store.clone(), mock.clone(), mock, executor, Settings::default());
        let checkpointer = Arc::new(InMemoryCheckpointSaver::new());
        let graph = Arc::new(CaseGraph::new(ctx, checkpointer));
        let supervisor = Supervisor::new(store, graph);

        let outcome = supervisor
            .invoke(case.id, TriggerType::InitialRequest, None)
            .await
            .unwrap();
        assert_eq!(outcome, SupervisorOutcome::SkippedLocked);
    }
}
