#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::{post, put};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use mapcalc_api::config::ServerConfig;
use mapcalc_api::router::build_app_router;
use mapcalc_api::state::AppState;
use mapcalc_events::{ResultBus, ResultDispatcher, ResultSink, UpstreamClient, UpstreamConfig};
use mapcalc_worker::{TaskDelay, TaskExecutor};

// ---------------------------------------------------------------------------
// Fake upstream main service
// ---------------------------------------------------------------------------

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
    puts: Arc<Mutex<Vec<RecordedPut>>>,
}

/// Upstream stand-in: logins return `token-N`, result PUTs return 200.
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

    pub fn login_count(&self) -> usize {
        self.shared.logins.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.shared.puts.lock().unwrap().clone()
    }

    /// Poll until at least `count` PUTs arrived, or panic after `timeout`.
    pub async fn wait_for_puts(&self, count: usize, timeout: Duration) -> Vec<RecordedPut> {
        tokio::time::timeout(timeout, async {
            loop {
                let puts = self.puts();
                if puts.len() >= count {
                    return puts;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {count} upstream PUTs within {timeout:?}"))
    }
}

async fn login(State(shared): State<Shared>) -> Json<Value> {
    let n = shared.logins.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "token": format!("token-{n}") }))
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
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// App under test
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` pointing at `upstream_url` with moderator
/// credentials set and the given task delay.
pub fn test_config(upstream_url: &str, task_delay: TaskDelay) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
        ],
        request_timeout_secs: 30,
        task_delay,
        upstream: UpstreamConfig::new(upstream_url).with_credentials("moderator", "secret"),
    }
}

/// Build the full application router plus its background services
/// (executor and result dispatcher), mirroring `main.rs`.
pub fn build_test_app(config: ServerConfig) -> Router {
    let upstream = UpstreamClient::from_config(config.upstream.clone()).unwrap();
    let (results, completions) = ResultBus::channel();
    tokio::spawn(
        ResultDispatcher::new(Arc::new(upstream) as Arc<dyn ResultSink>)
            .run(completions, CancellationToken::new()),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        executor: Arc::new(TaskExecutor::start()),
        results,
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<String>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
