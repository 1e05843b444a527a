use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};

use crate::{
    errors::ServiceError,
    services::submissions::{NewSubmission, SubmissionReceipt},
    ApiResponse, AppState,
};

/// Build the submissions Router scoped under `/api/v1/submissions`.
pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/", post(create_submission))
}

/// Submit one inspection batch: header fields plus N defect lines, expanded
/// into N records sharing a batch id.
#[utoipa::path(
    post,
    path = "/api/v1/submissions",
    request_body = NewSubmission,
    responses(
        (status = 201, description = "Batch recorded", body = ApiResponse<SubmissionReceipt>),
        (status = 400, description = "Submission rejected by validation", body = crate::errors::ErrorResponse),
        (status = 409, description = "A submission is already in flight", body = crate::errors::ErrorResponse)
    ),
    tag = "Submissions"
)]
pub async fn create_submission(
    State(state): State<AppState>,
    Json(payload): Json<NewSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionReceipt>>), ServiceError> {
    let receipt = state.services.submissions.submit(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}
