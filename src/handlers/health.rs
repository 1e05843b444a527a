use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::AppState;

/// Build the health Router scoped under `/api/v1/health`.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// Liveness probe with the current record-set size.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is healthy")),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "records": state.snapshot().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
