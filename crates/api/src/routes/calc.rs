use axum::routing::post;
use axum::Router;

use crate::handlers::calc;
use crate::state::AppState;

/// Mount the calculation route.
pub fn router() -> Router<AppState> {
    Router::new().route("/calc", post(calc::submit_calculation))
}
