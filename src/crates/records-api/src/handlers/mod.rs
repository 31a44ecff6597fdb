pub mod graph_state;
pub mod human_decision;
pub mod inbound_mail;

/// Liveness probe. No state is touched; a 200 here only confirms the
/// process is accepting connections.
pub async fn health() -> &'static str {
    "ok"
}
