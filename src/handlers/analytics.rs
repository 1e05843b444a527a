use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;

use crate::{
    errors::ServiceError,
    services::analytics::{DashboardStats, RecordFilter},
    ApiResponse, AppState,
};

/// Build the analytics Router scoped under `/api/v1/analytics`.
pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Aggregated per-process defect statistics under the composite filter:
/// equality constraints over group/model/process/range/version/equipment
/// plus a time window anchored at the request instant.
#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    params(RecordFilter),
    responses(
        (status = 200, description = "Dashboard statistics", body = ApiResponse<DashboardStats>)
    ),
    tag = "Analytics"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<ApiResponse<DashboardStats>>, ServiceError> {
    let snapshot = state.snapshot();
    let stats = state
        .services
        .analytics
        .dashboard(&snapshot, &filter, Utc::now());
    Ok(Json(ApiResponse::success(stats)))
}
