//! Process bootstrap and the two job consumers that drain the Queue
//! Bridge (spec.md §2, §5, §6): the agent-job consumer, which is the
//! Run Supervisor's only caller outside of tests, and the email-job
//! consumer, which stands in for the mail-provider worker the original
//! delegates outbound sends to (an external collaborator, per spec.md §1).

use std::sync::Arc;

use chrono::Utc;
use records_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver, PgCheckpointSaver};
use records_config::{ExecutionMode, Settings};
use records_executor::{DryGateway, Executor, LiveGateway, OutboundGateway};
use records_graph::{CaseGraph, GraphContext};
use records_llm::{AnthropicProvider, DraftGenerator, MockProvider, ResponseAnalyzer};
use records_queue::{AgentJob, EmailJob, Envelope, JobQueue};
use records_store::{InMemoryStore, PgStore, Store};
use records_supervisor::Supervisor;
use tracing::{error, info};

/// Every long-lived collaborator a process needs, built once at startup
/// and shared behind `Arc` (spec.md §9 "the compiled graph singleton").
pub struct Stack {
    pub store: Arc<dyn Store>,
    pub checkpointer: Arc<dyn CheckpointSaver>,
    pub supervisor: Arc<Supervisor>,
    pub agent_queue: Arc<JobQueue<AgentJob>>,
    pub email_queue: Arc<JobQueue<EmailJob>>,
}

/// Wires every crate in the workspace together per `settings`. A
/// malformed `DATABASE_URL` or an unreachable Postgres instance fails
/// loudly here rather than lazily on first use.
pub async fn bootstrap(settings: Settings) -> anyhow::Result<Stack> {
    let pg_store = PgStore::connect(&settings.database_url).await?;
    pg_store.migrate().await?;
    let store: Arc<dyn Store> = Arc::new(pg_store);

    let pg_checkpointer = PgCheckpointSaver::connect(&settings.database_url).await?;
    pg_checkpointer.migrate().await?;
    let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(pg_checkpointer);

    let (analyzer, drafter): (Arc<dyn ResponseAnalyzer>, Arc<dyn DraftGenerator>) =
        match &settings.anthropic_api_key {
            Some(key) => {
                let provider = Arc::new(AnthropicProvider::new(key.clone()));
                (provider.clone(), provider)
            }
            None => {
                info!("no ANTHROPIC_API_KEY set, falling back to MockProvider");
                let provider = Arc::new(MockProvider::default());
                (provider.clone(), provider)
            }
        };

    let email_queue: Arc<JobQueue<EmailJob>> =
        JobQueue::new(settings.queue_max_attempts, settings.queue_backoff_base_secs);
    let agent_queue: Arc<JobQueue<AgentJob>> =
        JobQueue::new(settings.queue_max_attempts, settings.queue_backoff_base_secs);

    let gateway: Arc<dyn OutboundGateway> = match settings.execution_mode {
        ExecutionMode::Live => {
            Arc::new(LiveGateway::new(email_queue.clone(), settings.email_delay_minutes))
        }
        ExecutionMode::Dry => Arc::new(DryGateway),
    };

    let executor = Arc::new(Executor::new(store.clone(), gateway, settings.followup_delay_days));
    let ctx = GraphContext::new(store.clone(), analyzer, drafter, executor, settings);
    let graph = Arc::new(CaseGraph::new(ctx, checkpointer.clone()));
    let supervisor = Arc::new(Supervisor::new(store.clone(), graph));

    Ok(Stack { store, checkpointer, supervisor, agent_queue, email_queue })
}

/// An in-memory variant of [`bootstrap`] for running the whole stack
/// without Postgres: local development and integration tests.
pub fn bootstrap_in_memory(settings: Settings) -> Stack {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(InMemoryCheckpointSaver::new());
    let mock = Arc::new(MockProvider::default());

    let email_queue: Arc<JobQueue<EmailJob>> =
        JobQueue::new(settings.queue_max_attempts, settings.queue_backoff_base_secs);
    let agent_queue: Arc<JobQueue<AgentJob>> =
        JobQueue::new(settings.queue_max_attempts, settings.queue_backoff_base_secs);

    let gateway: Arc<dyn OutboundGateway> = match settings.execution_mode {
        ExecutionMode::Live => {
            Arc::new(LiveGateway::new(email_queue.clone(), settings.email_delay_minutes))
        }
        ExecutionMode::Dry => Arc::new(DryGateway),
    };

    let executor = Arc::new(Executor::new(store.clone(), gateway, settings.followup_delay_days));
    let ctx = GraphContext::new(store.clone(), mock.clone(), mock, executor, settings);
    let graph = Arc::new(CaseGraph::new(ctx, checkpointer.clone()));
    let supervisor = Arc::new(Supervisor::new(store.clone(), graph));

    Stack { store, checkpointer, supervisor, agent_queue, email_queue }
}

/// Drains `agent_queue` forever, dispatching each job into the
/// Supervisor's `invoke`/`resume` per its variant (spec.md §4.5). Runs
/// until the queue's senders are all dropped.
pub async fn run_agent_consumer(supervisor: Arc<Supervisor>, queue: Arc<JobQueue<AgentJob>>) {
    while let Some(envelope) = queue.recv().await {
        let job_id = envelope.job_id.clone();
        let result = dispatch_agent_job(&supervisor, &envelope).await;
        match result {
            Ok(()) => queue.ack(&job_id).await,
            Err(err) => {
                error!(job_id, error = %err, "agent job failed");
                if let Err(retry_err) = queue.retry(envelope).await {
                    error!(job_id, error = %retry_err, "agent job exhausted retries");
                }
            }
        }
    }
}

async fn dispatch_agent_job(
    supervisor: &Supervisor,
    envelope: &Envelope<AgentJob>,
) -> anyhow::Result<()> {
    match envelope.payload.clone() {
        AgentJob::RunOnInbound { case_id, message_id } => {
            supervisor
                .invoke(case_id, records_core::TriggerType::InboundMessage, Some(message_id))
                .await?;
        }
        AgentJob::RunOnSchedule { case_id } => {
            supervisor
                .invoke(case_id, records_core::TriggerType::ScheduledFollowup, None)
                .await?;
        }
        AgentJob::ResumeFromHuman { case_id, proposal_id, human_decision } => {
            supervisor.resume(case_id, proposal_id, human_decision).await?;
        }
    }
    Ok(())
}

/// Drains `email_queue` forever, honoring each job's `deliver_after` and
/// then handing it to the mail provider collaborator — out of scope per
/// spec.md §1, so this only logs the hand-off (spec.md §4.6's
/// `EXECUTION_MODE=DRY` gateway already covers the no-op case; this is
/// the LIVE-mode consumer side of the same boundary).
pub async fn run_email_consumer(queue: Arc<JobQueue<EmailJob>>) {
    while let Some(envelope) = queue.recv().await {
        let job = &envelope.payload;
        let wait = (job.deliver_after - Utc::now()).to_std().unwrap_or_default();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        info!(
            proposal_id = %job.proposal_id,
            to = %job.to,
            job_id = %envelope.job_id,
            "handing email job to mail provider"
        );
        queue.ack(&envelope.job_id).await;
    }
}
