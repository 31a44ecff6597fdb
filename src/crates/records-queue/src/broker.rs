//! An in-process stand-in for the BullMQ-backed `agentQueue` /
//! `agentWorker` pair in `ADD TO EXISTING email-queue.js`: a bounded
//! channel plus a job-ID dedup set and exponential-backoff redelivery.
//! A production deployment would swap this broker for a real queue
//! (Redis-backed BullMQ, SQS, etc.) behind the same `enqueue`/`recv`/
//! `retry` surface; nothing upstream needs to know which one is in use.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::backoff::backoff_delay;
use crate::error::{QueueError, Result};

/// A job in flight, tagged with its dedup key and current attempt count.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub job_id: String,
    pub attempt: u32,
    pub payload: T,
}

/// A generic in-process job broker. `T` is the job payload type (an
/// `AgentJob` or `EmailJob`); one `JobQueue<T>` exists per job class, the
/// same split `ADD TO EXISTING email-queue.js` draws between the agent
/// queue and the mail queue.
pub struct JobQueue<T> {
    tx: mpsc::UnboundedSender<Envelope<T>>,
    rx: Mutex<mpsc::UnboundedReceiver<Envelope<T>>>,
    in_flight: Mutex<HashSet<String>>,
    max_attempts: u32,
    backoff_base_secs: u64,
}

impl<T: Clone + Send + 'static> JobQueue<T> {
    pub fn new(max_attempts: u32, backoff_base_secs: u64) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tx,
            rx: Mutex::new(rx),
            in_flight: Mutex::new(HashSet::new()),
            max_attempts,
            backoff_base_secs,
        })
    }

    /// Enqueues a job under `job_id`. A `job_id` already in flight is
    /// silently dropped: the caller already has a pending attempt for the
    /// same work (spec.md §5's dedup contract, mirrored here rather than
    /// only at the store layer so redundant scheduler ticks never pile up
    /// duplicate work on the channel).
    pub async fn enqueue(&self, job_id: String, payload: T) -> Result<()> {
        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.insert(job_id.clone()) {
            info!(job_id, "job already in flight, dropping duplicate enqueue");
            return Ok(());
        }
        self.tx
            .send(Envelope { job_id, attempt: 0, payload })
            .map_err(|_| QueueError::Closed)
    }

    /// Waits for the next job, or `None` once every sender has dropped.
    pub async fn recv(&self) -> Option<Envelope<T>> {
        self.rx.lock().await.recv().await
    }

    /// Marks `job_id` as no longer in flight, on success or permanent
    /// failure. Must be called exactly once per job handed out by `recv`.
    pub async fn ack(&self, job_id: &str) {
        self.in_flight.lock().await.remove(job_id);
    }

    /// Schedules a redelivery of `envelope` after exponential backoff, or
    /// fails permanently once `max_attempts` is exhausted.
    pub async fn retry(self: &Arc<Self>, envelope: Envelope<T>) -> Result<()> {
        if envelope.attempt + 1 >= self.max_attempts {
            self.ack(&envelope.job_id).await;
            warn!(job_id = %envelope.job_id, attempts = envelope.attempt + 1, "job exhausted retries");
            return Err(QueueError::AttemptsExhausted(envelope.job_id));
        }

        let delay = backoff_delay(envelope.attempt, self.backoff_base_secs);
        let queue = Arc::clone(self);
        let next_attempt = envelope.attempt + 1;
        let job_id = envelope.job_id.clone();
        let payload = envelope.payload;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = queue.tx.send(Envelope {
                job_id,
                attempt: next_attempt,
                payload,
            });
        });
        Ok(())
    }

}

/// Runs a single job handler under a per-job timeout, mapping a timeout
/// into the same `QueueError` the broker's retry path expects.
pub async fn run_with_timeout<F, Fut, R>(timeout: Duration, handler: F) -> Result<R>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    tokio::time::timeout(timeout, handler())
        .await
        .map_err(|_| QueueError::TimedOut("handler".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_job_id_is_dropped() {
        let queue: Arc<JobQueue<u32>> = JobQueue::new(3, 1);
        queue.enqueue("a".to_string(), 1).await.unwrap();
        queue.enqueue("a".to_string(), 2).await.unwrap();

        let first = queue.recv().await.unwrap();
        assert_eq!(first.payload, 1);

        // The duplicate never made it onto the channel.
        queue.ack(&first.job_id).await;
        queue.enqueue("a".to_string(), 3).await.unwrap();
        let second = queue.recv().await.unwrap();
        assert_eq!(second.payload, 3);
    }

    #[tokio::test]
    async fn retry_exhausts_after_max_attempts() {
        let queue: Arc<JobQueue<u32>> = JobQueue::new(2, 0);
        queue.enqueue("a".to_string(), 1).await.unwrap();
        let envelope = queue.recv().await.unwrap();

        // attempt 0 -> retry schedules attempt 1 (max_attempts=2, so 0+1<2 ok)
        queue.retry(envelope).await.unwrap();
        let redelivered = queue.recv().await.unwrap();
        assert_eq!(redelivered.attempt, 1);

        // attempt 1 -> 1+1 >= 2, exhausted
        let result = queue.retry(redelivered).await;
        assert!(matches!(result, Err(QueueError::AttemptsExhausted(_))));
    }

    #[tokio::test]
    async fn ack_allows_job_id_to_be_reenqueued() {
        let queue: Arc<JobQueue<u32>> = JobQueue::new(3, 1);
        queue.enqueue("a".to_string(), 1).await.unwrap();
        let envelope = queue.recv().await.unwrap();
        queue.ack(&envelope.job_id).await;

        queue.enqueue("a".to_string(), 2).await.unwrap();
        let redone = queue.recv().await.unwrap();
        assert_eq!(redone.payload, 2);
    }
}
