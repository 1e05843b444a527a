pub mod analytics;
pub mod health;
pub mod records;
pub mod submissions;

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::services::analytics::AnalyticsService;
use crate::services::records::RecordService;
use crate::services::submissions::SubmissionService;
use crate::store::DefectStore;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub submissions: Arc<SubmissionService>,
    pub records: Arc<RecordService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(store: Arc<dyn DefectStore>, catalog: Arc<Catalog>, session_id: String) -> Self {
        Self {
            submissions: Arc::new(SubmissionService::new(
                store.clone(),
                catalog.clone(),
                session_id.clone(),
            )),
            records: Arc::new(RecordService::new(store, session_id)),
            analytics: Arc::new(AnalyticsService::new(catalog)),
        }
    }
}
