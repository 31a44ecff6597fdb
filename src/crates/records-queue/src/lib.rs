//! The Queue Bridge: job envelopes carried between the API surface, the
//! Supervisor, and the Executor, plus the in-process broker and backoff
//! policy that stand in for a production message queue (spec.md §4.6,
//! §6). Grounded in `ADD TO EXISTING email-queue.js`'s `agentQueue` /
//! `agentWorker` split.

mod backoff;
mod broker;
mod error;
mod job;

pub use backoff::backoff_delay;
pub use broker::{run_with_timeout, Envelope, JobQueue};
pub use error::{QueueError, Result};
pub use job::{AgentJob, EmailJob};
