use std::time::Duration;

use mapcalc_events::UpstreamConfig;
use mapcalc_worker::jobs::{TaskDelay, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Range the simulated computation time is drawn from.
    pub task_delay: TaskDelay,
    /// Upstream main service connection and moderator credentials.
    pub upstream: UpstreamConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                       |
    /// |------------------------|-----------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                     |
    /// | `PORT`                 | `8000`                                        |
    /// | `CORS_ORIGINS`         | `http://localhost:3000,http://127.0.0.1:3000` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                          |
    /// | `TASK_DELAY_MIN_SECS`  | `5`                                           |
    /// | `TASK_DELAY_MAX_SECS`  | `10`                                          |
    ///
    /// Upstream variables are documented on [`UpstreamConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let min_delay = env_secs("TASK_DELAY_MIN_SECS").unwrap_or(DEFAULT_MIN_DELAY);
        let max_delay = env_secs("TASK_DELAY_MAX_SECS").unwrap_or(DEFAULT_MAX_DELAY);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            task_delay: TaskDelay::new(min_delay, max_delay),
            upstream: UpstreamConfig::from_env(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_secs(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    let secs: u64 = raw
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be a whole number of seconds"));
    Some(Duration::from_secs(secs))
}
