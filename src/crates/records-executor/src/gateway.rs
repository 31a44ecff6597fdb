//! The boundary between a claimed execution and the outside world: mail
//! delivery and escalation notification. Split out as a trait so
//! `EXECUTION_MODE=DRY` (spec.md §4.6, §7) can swap in a no-op without
//! touching the claim/persist logic in [`crate::executor::Executor`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use records_core::{CaseId, ProposalId};
use records_queue::{EmailJob, JobQueue};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;

/// Everything the executor needs to hand off to the outside world once a
/// proposal is claimed. Implementations must be idempotent on
/// `execution_key`: the executor always calls this exactly once per
/// successful claim, but a claim can still be retried after a crash
/// between the claim and the call succeeding.
#[async_trait]
pub trait OutboundGateway: Send + Sync {
    async fn enqueue_email(&self, job: EmailJob) -> Result<()>;
    async fn notify_escalation(&self, case_id: CaseId, reason: &str, urgency: &str) -> Result<()>;
}

/// Enqueues real mail jobs onto the outbound `records-queue` broker, with
/// the human-like randomized delay spec.md §4.6 calls for so agencies
/// never see replies land at inhuman speed.
pub struct LiveGateway {
    outbound: Arc<JobQueue<EmailJob>>,
    delay_minutes: (u32, u32),
}

impl LiveGateway {
    pub fn new(outbound: Arc<JobQueue<EmailJob>>, delay_minutes: (u32, u32)) -> Self {
        Self { outbound, delay_minutes }
    }

    fn jittered_deliver_after(&self) -> DateTime<Utc> {
        let (lo, hi) = self.delay_minutes;
        let minutes = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        Utc::now() + chrono::Duration::minutes(minutes as i64)
    }
}

#[async_trait]
impl OutboundGateway for LiveGateway {
    async fn enqueue_email(&self, mut job: EmailJob) -> Result<()> {
        job.deliver_after = self.jittered_deliver_after();
        let job_id = job.job_id.clone();
        self.outbound.enqueue(job_id, job).await?;
        Ok(())
    }

    async fn notify_escalation(&self, case_id: CaseId, reason: &str, urgency: &str) -> Result<()> {
        info!(%case_id, reason, urgency, "escalation notified");
        Ok(())
    }
}

/// Logs every side effect instead of performing it (`EXECUTION_MODE=DRY`).
/// Everything upstream of the gateway, including the claim itself, still
/// runs for real: dry mode exercises the whole pipeline except the last
/// hop to an agency's inbox.
pub struct DryGateway;

#[async_trait]
impl OutboundGateway for DryGateway {
    async fn enqueue_email(&self, job: EmailJob) -> Result<()> {
        info!(proposal_id = %job.proposal_id, to = %job.to, "dry run: would enqueue email");
        Ok(())
    }

    async fn notify_escalation(&self, case_id: CaseId, reason: &str, urgency: &str) -> Result<()> {
        info!(%case_id, reason, urgency, "dry run: would notify escalation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_gateway_never_enqueues() {
        let gateway = DryGateway;
        let job = EmailJob {
            job_id: "exec:1".to_string(),
            case_id: CaseId(1),
            proposal_id: ProposalId(1),
            to: "agency@example.gov".to_string(),
            subject: "Records Request".to_string(),
            body_text: "body".to_string(),
            body_html: "<p>body</p>".to_string(),
            deliver_after: Utc::now(),
        };
        assert!(gateway.enqueue_email(job).await.is_ok());
    }
}
