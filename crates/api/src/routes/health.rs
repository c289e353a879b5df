use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether moderator credentials are configured for result push-back.
    pub push_enabled: bool,
    /// Whether the task executor still accepts work.
    pub executor_running: bool,
}

/// GET /health -- returns service status.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let executor_running = !state.executor.is_shut_down();

    Json(HealthResponse {
        status: if executor_running { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        push_enabled: state.config.upstream.push_enabled(),
        executor_running,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
