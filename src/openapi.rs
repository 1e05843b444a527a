use axum::response::Json;
use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::models::{DefectLine, DefectRecord, ModelGroup};
use crate::services::analytics::{DashboardStats, DefectTypeStat, ProcessStats, TimeWindow};
use crate::services::submissions::{NewSubmission, SubmissionReceipt};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QMS Inspection API",
        version = "0.1.0",
        description = "Defect-entry recording and batch-level defect-rate aggregation for a manufacturing inspection line."
    ),
    paths(
        crate::handlers::submissions::create_submission,
        crate::handlers::records::list_records,
        crate::handlers::records::delete_record,
        crate::handlers::records::export_records,
        crate::handlers::records::restore_records,
        crate::handlers::analytics::get_dashboard,
        crate::handlers::health::health,
    ),
    components(schemas(
        DefectRecord,
        DefectLine,
        ModelGroup,
        NewSubmission,
        SubmissionReceipt,
        DashboardStats,
        ProcessStats,
        DefectTypeStat,
        TimeWindow,
        ErrorResponse,
    )),
    tags(
        (name = "Submissions", description = "Batch defect-entry submission"),
        (name = "Records", description = "Record listing, deletion, backup and restore"),
        (name = "Analytics", description = "Aggregated defect-rate statistics"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
