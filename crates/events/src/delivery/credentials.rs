//! Cached moderator bearer token.
//!
//! [`CredentialCache`] keeps a single token obtained through an
//! [`Authenticator`]. The token has no expiry tracking; it is replaced only
//! when a caller asks for a forced refresh (typically after a 401).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::config::{ModeratorCredentials, TokenFieldPath};

/// Performs the login exchange that yields a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Log in and return a token, or `None` on any failure.
    async fn login(&self, credentials: &ModeratorCredentials) -> Option<String>;
}

/// Thread-safe get-or-refresh cache for the moderator token.
pub struct CredentialCache {
    credentials: Option<ModeratorCredentials>,
    authenticator: Arc<dyn Authenticator>,
    /// Held for the whole get-or-refresh sequence so concurrent callers
    /// never run overlapping logins.
    token: Mutex<Option<String>>,
}

impl CredentialCache {
    pub fn new(
        credentials: Option<ModeratorCredentials>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            credentials,
            authenticator,
            token: Mutex::new(None),
        }
    }

    /// Whether credentials are configured at all.
    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Return the cached token, logging in first if there is none or if
    /// `force_refresh` is set.
    ///
    /// Returns `None` when no credentials are configured or the login fails;
    /// a failed login leaves any previously cached token in place.
    pub async fn get(&self, force_refresh: bool) -> Option<String> {
        let credentials = self.credentials.as_ref()?;

        let mut cached = self.token.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref() {
                return Some(token.clone());
            }
        }

        let Some(fresh) = self.authenticator.login(credentials).await else {
            tracing::warn!(
                username = %credentials.username,
                force_refresh,
                "Moderator login did not yield a token"
            );
            return None;
        };

        tracing::debug!(force_refresh, "Moderator token refreshed");
        *cached = Some(fresh.clone());
        Some(fresh)
    }
}

/// Pull the first non-blank string found at any of `paths`, trimmed.
pub fn extract_token(payload: &Value, paths: &[TokenFieldPath]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| path.lookup(payload)?.as_str())
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
