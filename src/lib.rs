//! QMS Inspection API Library
//!
//! Defect-entry recording and batch-level defect-rate aggregation for a
//! manufacturing inspection line.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::DefectStore>,
    pub config: config::AppConfig,
    pub catalog: Arc<catalog::Catalog>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Latest full snapshot of the record set, as last published by the
    /// store's subscription feed.
    pub fn snapshot(&self) -> store::RecordSet {
        self.store.subscribe().borrow().clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// All v1 API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/submissions", handlers::submissions::submission_routes())
        .nest("/records", handlers::records::record_routes())
        .nest("/analytics", handlers::analytics::analytics_routes())
        .nest("/health", handlers::health::health_routes())
}

/// Full application router over a prepared state. Shared by the binary and
/// the integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "qms-api up" }))
        .nest("/api/v1", api_v1_routes())
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .with_state(state)
}
