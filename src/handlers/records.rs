use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    errors::ServiceError, models::DefectRecord, services::records::ListFilter, ApiResponse,
    AppState,
};

/// Build the records Router scoped under `/api/v1/records`.
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records))
        .route("/:id", delete(delete_record))
        .route("/export", get(export_records))
        .route("/restore", post(restore_records))
}

/// Flat filtered record list for the master log view, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/records",
    params(ListFilter),
    responses(
        (status = 200, description = "Filtered record list", body = ApiResponse<Vec<DefectRecord>>)
    ),
    tag = "Records"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<ApiResponse<Vec<DefectRecord>>>, ServiceError> {
    let snapshot = state.snapshot();
    let records = state.services.records.list(&snapshot, &filter);
    Ok(Json(ApiResponse::success(records)))
}

/// Delete one record by identifier.
#[utoipa::path(
    delete,
    path = "/api/v1/records/{id}",
    params(("id" = Uuid, Path, description = "Record identifier")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Unknown record", body = crate::errors::ErrorResponse)
    ),
    tag = "Records"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.records.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full record set for backup.
#[utoipa::path(
    get,
    path = "/api/v1/records/export",
    responses(
        (status = 200, description = "Full record set", body = ApiResponse<Vec<DefectRecord>>)
    ),
    tag = "Records"
)]
pub async fn export_records(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DefectRecord>>>, ServiceError> {
    let snapshot = state.snapshot();
    let records = state.services.records.export(&snapshot);
    Ok(Json(ApiResponse::success(records)))
}

/// Re-insert records from an external backup payload. The payload must be a
/// JSON array of record-like objects; a malformed entry aborts the whole
/// restore before anything is written.
#[utoipa::path(
    post,
    path = "/api/v1/records/restore",
    responses(
        (status = 200, description = "Records restored", body = ApiResponse<usize>),
        (status = 400, description = "Malformed backup payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Records"
)]
pub async fn restore_records(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<usize>>, ServiceError> {
    let restored = state.services.records.restore(payload).await?;
    Ok(Json(ApiResponse::success(restored)))
}
