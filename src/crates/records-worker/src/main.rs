//! Standalone consumer process: drains the agent-job and email-job
//! queues without exposing any HTTP surface.
//!
//! With the in-process `records-queue` broker (spec.md §2, §5) this only
//! ever observes jobs enqueued by its own process; it is kept as a
//! separate binary for the deployment that swaps the broker for an
//! out-of-process queue, where running workers and the API as separate
//! processes is the point. Until then, run `records-server`, which
//! spawns the same consumer loops in-process alongside its axum server.

use records_config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let settings = Settings::from_env()?;
    tracing::info!(execution_mode = ?settings.execution_mode, "bootstrapping worker");

    let stack = records_worker::bootstrap(settings).await?;

    tokio::join!(
        records_worker::run_agent_consumer(stack.supervisor.clone(), stack.agent_queue.clone()),
        records_worker::run_email_consumer(stack.email_queue.clone()),
    );

    Ok(())
}
