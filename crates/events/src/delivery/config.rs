//! Connection settings for the upstream main service.
//!
//! [`UpstreamConfig::from_env`] reads the environment; if either moderator
//! variable is empty the credentials are `None` and result push-back is
//! disabled rather than treated as an error.

use std::fmt;
use std::time::Duration;

use mapcalc_core::types::RecordId;
use serde_json::Value;

/// Base URL used when `MAIN_SERVICE_URL` is not set.
pub const DEFAULT_MAIN_SERVICE_URL: &str = "http://localhost:8080";

/// Timeout applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where to look for the bearer token in a login response, in order.
pub const DEFAULT_TOKEN_FIELD_PATHS: [&str; 8] = [
    "token",
    "access_token",
    "access",
    "jwt",
    "data.token",
    "data.access_token",
    "data.access",
    "data.jwt",
];

// ---------------------------------------------------------------------------
// ModeratorCredentials
// ---------------------------------------------------------------------------

/// Service-account login used to obtain the moderator bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct ModeratorCredentials {
    pub username: String,
    pub password: String,
}

impl ModeratorCredentials {
    /// Returns `None` unless both values are non-blank after trimming.
    pub fn new(username: &str, password: &str) -> Option<Self> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for ModeratorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeratorCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokenFieldPath
// ---------------------------------------------------------------------------

/// A dotted path into a JSON object, e.g. `data.access_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFieldPath(Vec<String>);

impl TokenFieldPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(dotted: &str) -> Option<Self> {
        let segments: Vec<String> = dotted.trim().split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self(segments))
    }

    /// Follow the path through nested objects.
    pub fn lookup<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(payload, |node, segment| node.as_object()?.get(segment))
    }
}

impl fmt::Display for TokenFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

fn default_token_paths() -> Vec<TokenFieldPath> {
    DEFAULT_TOKEN_FIELD_PATHS
        .iter()
        .filter_map(|p| TokenFieldPath::parse(p))
        .collect()
}

// ---------------------------------------------------------------------------
// UpstreamConfig
// ---------------------------------------------------------------------------

/// Settings for talking to the upstream main service.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Moderator login; `None` disables result push-back.
    pub credentials: Option<ModeratorCredentials>,
    pub request_timeout: Duration,
    /// Candidate token locations in a login response, tried in order.
    pub token_paths: Vec<TokenFieldPath>,
}

impl UpstreamConfig {
    /// Config for `base_url` with no credentials and default settings.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            credentials: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token_paths: default_token_paths(),
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = ModeratorCredentials::new(username, password);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `MAIN_SERVICE_URL`      | `http://localhost:8080`     |
    /// | `MODERATOR_USERNAME`    | unset (push-back disabled)  |
    /// | `MODERATOR_PASSWORD`    | unset (push-back disabled)  |
    /// | `UPSTREAM_TIMEOUT_SECS` | `5`                         |
    /// | `TOKEN_FIELD_PATHS`     | `token,access_token,...`    |
    pub fn from_env() -> Self {
        let base_url = std::env::var("MAIN_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_MAIN_SERVICE_URL.to_string());

        let mut config = Self::new(&base_url).with_credentials(
            &std::env::var("MODERATOR_USERNAME").unwrap_or_default(),
            &std::env::var("MODERATOR_PASSWORD").unwrap_or_default(),
        );

        if let Ok(raw) = std::env::var("UPSTREAM_TIMEOUT_SECS") {
            config.request_timeout = parse_timeout_secs(&raw);
        }

        if let Ok(raw) = std::env::var("TOKEN_FIELD_PATHS") {
            config.token_paths = require_token_paths(&raw);
        }

        config
    }

    /// Whether moderator credentials are configured.
    pub fn push_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/users/login", self.base_url)
    }

    pub fn result_url(&self, record_id: RecordId) -> String {
        format!("{}/api/records/{record_id}/result", self.base_url)
    }
}

/// Panics unless `raw` is a whole number of seconds.
fn parse_timeout_secs(raw: &str) -> Duration {
    let secs: u64 = raw
        .trim()
        .parse()
        .unwrap_or_else(|_| panic!("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds"));
    Duration::from_secs(secs)
}

/// Panics if `raw` yields no usable path.
fn require_token_paths(raw: &str) -> Vec<TokenFieldPath> {
    let paths = parse_token_paths(raw);
    if paths.is_empty() {
        panic!("TOKEN_FIELD_PATHS must name at least one field path, got '{raw}'");
    }
    paths
}

/// Parse a comma-separated list of dotted paths, skipping invalid entries.
pub fn parse_token_paths(raw: &str) -> Vec<TokenFieldPath> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(TokenFieldPath::parse)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
