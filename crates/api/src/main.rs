use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapcalc_api::config::ServerConfig;
use mapcalc_api::router::build_app_router;
use mapcalc_api::state::AppState;
use mapcalc_events::{ResultBus, ResultDispatcher, ResultSink, UpstreamClient};
use mapcalc_worker::TaskExecutor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mapcalc_api=debug,mapcalc_events=debug,mapcalc_worker=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        upstream = %config.upstream.base_url,
        push_enabled = config.upstream.push_enabled(),
        min_delay_secs = config.task_delay.min().as_secs(),
        max_delay_secs = config.task_delay.max().as_secs(),
        "Loaded server configuration"
    );
    if !config.upstream.push_enabled() {
        tracing::warn!("MODERATOR_USERNAME/MODERATOR_PASSWORD not set, results will not be pushed");
    }

    // --- Upstream client ---
    let upstream = UpstreamClient::from_config(config.upstream.clone())
        .expect("Failed to build upstream HTTP client");

    // --- Result dispatcher ---
    let (results, completions) = ResultBus::channel();
    let dispatcher_cancel = CancellationToken::new();
    let dispatcher = ResultDispatcher::new(Arc::new(upstream) as Arc<dyn ResultSink>);
    let dispatcher_handle = tokio::spawn(dispatcher.run(completions, dispatcher_cancel.clone()));

    // --- Task executor ---
    let executor = Arc::new(TaskExecutor::start());

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        executor: Arc::clone(&executor),
        results,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Queued computations are abandoned, not drained.
    executor.shutdown();

    dispatcher_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    tracing::info!("Result dispatcher stopped");

    tracing::info!("Shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
