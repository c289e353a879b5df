use std::sync::Arc;

use mapcalc_events::ResultBus;
use mapcalc_worker::TaskExecutor;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Single-worker executor for pressure computations.
    pub executor: Arc<TaskExecutor>,
    /// Channel finished results are published on for upstream delivery.
    pub results: ResultBus,
}
