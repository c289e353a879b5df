//! HTTP client for the upstream main service.
//!
//! [`UpstreamApi`] wraps the two raw endpoints (moderator login and result
//! write). [`UpstreamClient`] layers the credential cache on top and
//! implements the best-effort push: one PUT, and on a 401 a single forced
//! token refresh followed by exactly one retry.

use std::sync::Arc;

use async_trait::async_trait;
use mapcalc_core::measurement::TaskResult;
use mapcalc_core::types::RecordId;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::config::{ModeratorCredentials, UpstreamConfig};
use super::credentials::{extract_token, Authenticator, CredentialCache};
use crate::dispatcher::ResultSink;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failures talking to the upstream service. Never leaves this crate's
/// public push API; callers only see them in logs.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream answered with an error status.
    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body was not valid JSON.
    #[error("Invalid JSON in upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The login response was JSON but not an object.
    #[error("Login response is not a JSON object")]
    NotAnObject,

    /// None of the configured token paths held a usable token.
    #[error("Login response carries no token")]
    MissingToken,
}

/// What happened to a single result push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No token available (push-back disabled or login failed).
    Skipped,
    /// The upstream accepted the result.
    Delivered(StatusCode),
    /// The upstream answered with a non-success status.
    Rejected(StatusCode),
}

impl SubmitOutcome {
    fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            SubmitOutcome::Delivered(status)
        } else {
            SubmitOutcome::Rejected(status)
        }
    }
}

/// JSON body for `PUT /api/records/{id}/result`.
#[derive(Debug, Serialize)]
struct ResultPayload<'a> {
    result_stage: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_map: Option<f64>,
}

// ---------------------------------------------------------------------------
// UpstreamApi
// ---------------------------------------------------------------------------

/// Raw endpoint calls against the upstream service.
pub struct UpstreamApi {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamApi {
    /// Build the shared HTTP client with the configured request timeout.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// `POST /api/users/login` and extract the bearer token.
    ///
    /// Any status of 400 or above is a failure. An empty body is read as an
    /// empty object, which then fails token extraction.
    pub async fn fetch_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, UpstreamError> {
        let body = serde_json::json!({
            "login": username,
            "password": password,
        });

        let response = self
            .client
            .post(self.config.login_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(UpstreamError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let payload: Value = if bytes.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(&bytes)?
        };
        if !payload.is_object() {
            return Err(UpstreamError::NotAnObject);
        }

        extract_token(&payload, &self.config.token_paths).ok_or(UpstreamError::MissingToken)
    }

    /// `PUT /api/records/{id}/result` with a bearer token. Returns the
    /// response status without interpreting it.
    async fn put_result(
        &self,
        token: &str,
        record_id: RecordId,
        payload: &ResultPayload<'_>,
    ) -> Result<StatusCode, UpstreamError> {
        let response = self
            .client
            .put(self.config.result_url(record_id))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl Authenticator for UpstreamApi {
    async fn login(&self, credentials: &ModeratorCredentials) -> Option<String> {
        match self
            .fetch_token(&credentials.username, &credentials.password)
            .await
        {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(error = %e, url = %self.config.login_url(), "Moderator login failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UpstreamClient
// ---------------------------------------------------------------------------

/// Authenticated, best-effort result push to the upstream service.
pub struct UpstreamClient {
    api: Arc<UpstreamApi>,
    credentials: Arc<CredentialCache>,
}

impl UpstreamClient {
    /// Wire an API client and a credential cache backed by it.
    pub fn from_config(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let credentials = config.credentials.clone();
        let api = Arc::new(UpstreamApi::new(config)?);
        let cache = Arc::new(CredentialCache::new(
            credentials,
            Arc::clone(&api) as Arc<dyn Authenticator>,
        ));
        Ok(Self::new(api, cache))
    }

    pub fn new(api: Arc<UpstreamApi>, credentials: Arc<CredentialCache>) -> Self {
        Self { api, credentials }
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Log in directly, bypassing the cache.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        self.api.fetch_token(username, password).await.ok()
    }

    /// Push a computed result upstream. Never fails: every problem is logged
    /// and dropped.
    pub async fn submit_result(
        &self,
        record_id: RecordId,
        result_map: Option<f64>,
        result_stage: &str,
    ) {
        match self.try_submit_result(record_id, result_map, result_stage).await {
            Ok(SubmitOutcome::Delivered(status)) => {
                tracing::info!(record_id, status = status.as_u16(), "Result delivered upstream");
            }
            Ok(SubmitOutcome::Rejected(status)) => {
                tracing::warn!(record_id, status = status.as_u16(), "Upstream rejected result");
            }
            Ok(SubmitOutcome::Skipped) => {
                tracing::debug!(record_id, "No moderator token, result not pushed");
            }
            Err(e) => {
                tracing::warn!(record_id, error = %e, "Result push failed");
            }
        }
    }

    /// The push protocol with its outcome exposed.
    pub async fn try_submit_result(
        &self,
        record_id: RecordId,
        result_map: Option<f64>,
        result_stage: &str,
    ) -> Result<SubmitOutcome, UpstreamError> {
        let Some(token) = self.credentials.get(false).await else {
            return Ok(SubmitOutcome::Skipped);
        };

        let payload = ResultPayload {
            result_stage,
            result_map,
        };

        let status = self.api.put_result(&token, record_id, &payload).await?;
        if status != StatusCode::UNAUTHORIZED {
            return Ok(SubmitOutcome::from_status(status));
        }

        tracing::info!(record_id, "Moderator token rejected, refreshing once");
        let Some(refreshed) = self.credentials.get(true).await else {
            return Ok(SubmitOutcome::Rejected(status));
        };

        let status = self.api.put_result(&refreshed, record_id, &payload).await?;
        Ok(SubmitOutcome::from_status(status))
    }
}

#[async_trait]
impl ResultSink for UpstreamClient {
    async fn deliver(&self, result: &TaskResult) {
        self.submit_result(result.id, result.result_map, &result.result_stage)
            .await;
    }

    fn is_enabled(&self) -> bool {
        self.credentials.is_enabled()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
