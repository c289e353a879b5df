//! Handler for `POST /calc`.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::Form;
use mapcalc_core::measurement::Measurement;
use mapcalc_events::TaskCompletion;
use mapcalc_worker::{long_task, TaskOutcome};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /calc
///
/// Accepts a JSON or `application/x-www-form-urlencoded` body. Validate the
/// measurement, queue the slow computation and answer `200` with an empty
/// body straight away. The result is pushed upstream later by the result
/// dispatcher.
pub async fn submit_calculation(
    State(state): State<AppState>,
    request: Request,
) -> AppResult<StatusCode> {
    let payload = if is_form(request.headers()) {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &state)
            .await
            .map_err(|_| AppError::BadRequest("invalid form body".into()))?;
        form_to_object(fields)
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|_| AppError::BadRequest("unreadable request body".into()))?;
        parse_body(&body)?
    };
    let measurement = Measurement::from_json(&payload)?;

    let delay = state.config.task_delay;
    let handle = state
        .executor
        .submit(move || long_task(measurement, delay));
    let task_id = handle.id();

    let results = state.results.clone();
    handle.on_complete(move |task_id, outcome| match outcome {
        TaskOutcome::Completed(result) => results.publish(TaskCompletion::new(task_id, result)),
        TaskOutcome::Cancelled => {
            tracing::debug!(%task_id, "Task cancelled, nothing to deliver");
        }
    });

    tracing::info!(
        record_id = measurement.id,
        %task_id,
        sys = ?measurement.sys,
        dia = ?measurement.dia,
        "Calculation queued"
    );

    Ok(StatusCode::OK)
}

/// Decode the request body. An empty body reads as an empty object so it
/// fails on the missing `id` rather than on JSON syntax.
fn parse_body(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|_| AppError::BadRequest("invalid JSON body".into()))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

/// Form fields as a JSON object of strings. A repeated key keeps its last
/// value.
fn form_to_object(fields: Vec<(String, String)>) -> Value {
    let object: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Value::Object(object)
}
