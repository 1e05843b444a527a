#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use qms_api::{
    catalog::Catalog,
    config::AppConfig,
    handlers::AppServices,
    models::{DefectLine, DefectRecord, DefectRecordInput},
    services::submissions::NewSubmission,
    store::{DefectStore, InMemoryDefectStore, RecordSet, StoreError},
    AppState,
};

/// Build an application state over an arbitrary store implementation.
pub fn build_state(store: Arc<dyn DefectStore>) -> AppState {
    let catalog = Arc::new(Catalog::default());
    let services = AppServices::new(store.clone(), catalog.clone(), "test-session".to_string());
    AppState {
        store,
        config: AppConfig::default(),
        catalog,
        services,
    }
}

/// Router plus state backed by a fresh in-memory store.
pub fn test_app() -> (Router, AppState) {
    let state = build_state(Arc::new(InMemoryDefectStore::new()));
    (qms_api::app(state.clone()), state)
}

/// A PT/UPT submission with sensible header defaults and today's work dates.
pub fn submission(model: &str, process: &str, qty: u32, lines: Vec<DefectLine>) -> NewSubmission {
    let today = Utc::now().date_naive();
    NewSubmission {
        model: model.into(),
        process: process.into(),
        range: "-15~30psi".into(),
        connection_type: "Straight female".into(),
        sensor_thickness: "0.25T".into(),
        version: "1.5Ver".into(),
        temp_equip: "UPT#1".into(),
        aging_equip: "NT-189".into(),
        operator: "김검사".into(),
        remark: String::new(),
        batch_inspection_qty: qty,
        work_date_start: today,
        work_date_end: today,
        lines,
    }
}

/// A bare stored record for feeding the aggregation engine directly.
pub fn record(
    process: &str,
    batch_id: Uuid,
    defect_type: &str,
    quantity: u32,
    batch_inspection_qty: u32,
) -> DefectRecord {
    let today = Utc::now().date_naive();
    DefectRecord {
        id: Uuid::new_v4(),
        batch_id,
        group: None,
        model: "PT850".into(),
        process: process.into(),
        range: "-15~30psi".into(),
        connection_type: "Straight female".into(),
        sensor_thickness: "0.25T".into(),
        version: String::new(),
        temp_equip: String::new(),
        aging_equip: String::new(),
        operator: "김검사".into(),
        remark: String::new(),
        defect_type: defect_type.into(),
        quantity,
        batch_inspection_qty,
        work_date_start: Some(today),
        work_date_end: Some(today),
        created_at: Utc::now(),
        owner_id: "test-session".into(),
    }
}

/// Store wrapper that rejects creates for one poisoned defect type, for
/// exercising partial-batch failure reporting.
pub struct FailingStore {
    inner: InMemoryDefectStore,
    poison: String,
}

impl FailingStore {
    pub fn rejecting(defect_type: &str) -> Self {
        Self {
            inner: InMemoryDefectStore::new(),
            poison: defect_type.to_string(),
        }
    }
}

/// Store wrapper whose creates stall until released, for exercising the
/// in-flight submission guard.
pub struct StallingStore {
    inner: InMemoryDefectStore,
    gate: tokio::sync::Semaphore,
}

impl StallingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDefectStore::new(),
            gate: tokio::sync::Semaphore::new(0),
        }
    }

    /// Unblock all pending and future creates.
    pub fn release(&self) {
        self.gate.add_permits(tokio::sync::Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl DefectStore for StallingStore {
    async fn create(&self, input: DefectRecordInput) -> Result<Uuid, StoreError> {
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.create(input).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn restore(&self, inputs: Vec<DefectRecordInput>) -> Result<usize, StoreError> {
        self.inner.restore(inputs).await
    }

    fn subscribe(&self) -> watch::Receiver<RecordSet> {
        self.inner.subscribe()
    }
}

#[async_trait]
impl DefectStore for FailingStore {
    async fn create(&self, input: DefectRecordInput) -> Result<Uuid, StoreError> {
        if input.defect_type == self.poison {
            return Err(StoreError::ConnectionError("injected write failure".into()));
        }
        self.inner.create(input).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn restore(&self, inputs: Vec<DefectRecordInput>) -> Result<usize, StoreError> {
        self.inner.restore(inputs).await
    }

    fn subscribe(&self) -> watch::Receiver<RecordSet> {
        self.inner.subscribe()
    }
}
