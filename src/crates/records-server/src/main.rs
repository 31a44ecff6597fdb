//! The HTTP process: binds the axum router from `records-api` and, since
//! the Queue Bridge (`records-queue`) is an in-process broker rather than
//! a network-addressable one, spawns the same agent/email consumer loops
//! `records-worker` runs standalone, so a single process both accepts
//! webhook/decision traffic and actually drains what it enqueues.

use std::net::SocketAddr;

use records_api::{create_router, AppState};
use records_config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let settings = Settings::from_env()?;
    tracing::info!(execution_mode = ?settings.execution_mode, "bootstrapping server");

    let stack = records_worker::bootstrap(settings).await?;

    tokio::spawn(records_worker::run_agent_consumer(
        stack.supervisor.clone(),
        stack.agent_queue.clone(),
    ));
    tokio::spawn(records_worker::run_email_consumer(stack.email_queue.clone()));

    let app_state = AppState {
        store: stack.store,
        checkpointer: stack.checkpointer,
        agent_queue: stack.agent_queue,
    };
    let app = create_router(app_state);

    let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!(%addr, "starting records server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("records server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
