//! In-process stand-in for the upstream main service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

/// One `PUT /api/records/{id}/result` as the fake upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub record_id: i64,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct Shared {
    logins: Arc<AtomicUsize>,
    login_bodies: Arc<Mutex<Vec<Value>>>,
    login_replies: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    put_statuses: Arc<Mutex<VecDeque<StatusCode>>>,
    put_delays: Arc<Mutex<VecDeque<Duration>>>,
    puts: Arc<Mutex<Vec<RecordedPut>>>,
}

/// Scriptable fake upstream bound to an ephemeral local port.
///
/// Logins answer `{"token": "token-N"}` (N counts logins) and PUTs answer
/// 200 unless a reply has been queued. Queued PUT delays stall the answer
/// after the PUT has been recorded.
pub struct FakeUpstream {
    pub base_url: String,
    shared: Shared,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let shared = Shared::default();
        let app = Router::new()
            .route("/api/users/login", post(login))
            .route("/api/records/{id}/result", put(record_result))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shared,
        }
    }

    pub fn queue_login_reply(&self, status: StatusCode, body: &str) {
        self.shared
            .login_replies
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    pub fn queue_put_status(&self, status: StatusCode) {
        self.shared.put_statuses.lock().unwrap().push_back(status);
    }

    pub fn queue_put_delay(&self, delay: Duration) {
        self.shared.put_delays.lock().unwrap().push_back(delay);
    }

    pub fn login_count(&self) -> usize {
        self.shared.logins.load(Ordering::SeqCst)
    }

    pub fn login_bodies(&self) -> Vec<Value> {
        self.shared.login_bodies.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.shared.puts.lock().unwrap().clone()
    }
}

async fn login(State(shared): State<Shared>, Json(body): Json<Value>) -> (StatusCode, String) {
    let n = shared.logins.fetch_add(1, Ordering::SeqCst) + 1;
    shared.login_bodies.lock().unwrap().push(body);

    let scripted = shared.login_replies.lock().unwrap().pop_front();
    scripted.unwrap_or_else(|| (StatusCode::OK, json!({ "token": format!("token-{n}") }).to_string()))
}

async fn record_result(
    State(shared): State<Shared>,
    Path(record_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    shared.puts.lock().unwrap().push(RecordedPut {
        record_id,
        authorization,
        body,
    });

    let delay = shared.put_delays.lock().unwrap().pop_front();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let scripted = shared.put_statuses.lock().unwrap().pop_front();
    scripted.unwrap_or(StatusCode::OK)
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
