//! Record persistence contract and the in-memory implementation.
//!
//! The record set is owned by the store. Consumers never mutate stored
//! records; they observe the set through a latest-value subscription that
//! publishes a full snapshot after every mutation, and re-derive all
//! statistics from the snapshot.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::{DefectRecord, DefectRecordInput};

/// Immutable full snapshot of the record set.
pub type RecordSet = Arc<Vec<DefectRecord>>;

/// Store-level errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),
    #[error("store connection error: {0}")]
    ConnectionError(String),
    #[error("store rejected write: {0}")]
    WriteRejected(String),
}

/// Persistence contract for defect records.
///
/// Backed by a document store in production; the in-memory implementation
/// below serves development and tests with identical semantics.
#[async_trait]
pub trait DefectStore: Send + Sync {
    /// Append one record; the store assigns its id and creation timestamp.
    async fn create(&self, input: DefectRecordInput) -> Result<Uuid, StoreError>;

    /// Remove one record by identifier.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Re-insert an externally supplied backup as fresh records. Storage
    /// identifiers and timestamps are regenerated; batch and process
    /// identity are preserved. Disaster recovery only, not a routine write
    /// path.
    async fn restore(&self, inputs: Vec<DefectRecordInput>) -> Result<usize, StoreError>;

    /// Latest-value subscription to the full record set.
    fn subscribe(&self) -> watch::Receiver<RecordSet>;
}

struct Inner {
    records: Vec<DefectRecord>,
    last_created_at: DateTime<Utc>,
}

/// In-memory defect store
pub struct InMemoryDefectStore {
    inner: Mutex<Inner>,
    tx: watch::Sender<RecordSet>,
}

impl InMemoryDefectStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                last_created_at: DateTime::<Utc>::MIN_UTC,
            }),
            tx,
        }
    }

    /// Creation timestamps must be strictly monotonic so the default
    /// newest-first ordering is total even within one batch.
    fn next_timestamp(inner: &mut Inner) -> DateTime<Utc> {
        let mut now = Utc::now();
        if now <= inner.last_created_at {
            now = inner.last_created_at + Duration::microseconds(1);
        }
        inner.last_created_at = now;
        now
    }

    fn insert(inner: &mut Inner, input: DefectRecordInput) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = Self::next_timestamp(inner);
        inner.records.push(input.into_record(id, created_at));
        id
    }

    fn publish(&self, inner: &Inner) {
        let _ = self.tx.send(Arc::new(inner.records.clone()));
    }
}

impl Default for InMemoryDefectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DefectStore for InMemoryDefectStore {
    async fn create(&self, input: DefectRecordInput) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::insert(&mut inner, input);
        self.publish(&inner);
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        inner.records.remove(position);
        self.publish(&inner);
        Ok(())
    }

    async fn restore(&self, inputs: Vec<DefectRecordInput>) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let count = inputs.len();
        for input in inputs {
            Self::insert(&mut inner, input);
        }
        self.publish(&inner);
        Ok(count)
    }

    fn subscribe(&self) -> watch::Receiver<RecordSet> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_DEFECT;

    fn sample_input(batch_id: Uuid) -> DefectRecordInput {
        DefectRecordInput {
            batch_id,
            group: None,
            model: "PT850".into(),
            process: "1.코팅외관".into(),
            range: "-15~30psi".into(),
            connection_type: "Straight female".into(),
            sensor_thickness: "0.25T".into(),
            version: String::new(),
            temp_equip: String::new(),
            aging_equip: String::new(),
            operator: "kim".into(),
            remark: String::new(),
            defect_type: NO_DEFECT.into(),
            quantity: 0,
            batch_inspection_qty: 100,
            work_date_start: None,
            work_date_end: None,
            owner_id: "session".into(),
        }
    }

    #[tokio::test]
    async fn created_at_is_strictly_monotonic() {
        let store = InMemoryDefectStore::new();
        let batch = Uuid::new_v4();
        for _ in 0..50 {
            store.create(sample_input(batch)).await.unwrap();
        }
        let snapshot = store.subscribe().borrow().clone();
        for pair in snapshot.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn every_mutation_publishes_a_fresh_snapshot() {
        let store = InMemoryDefectStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_empty());

        let id = store.create(sample_input(Uuid::new_v4())).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        store.delete(id).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let store = InMemoryDefectStore::new();
        let missing = Uuid::new_v4();
        match store.delete(missing).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, missing),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn restore_inserts_all_records_and_publishes_once() {
        let store = InMemoryDefectStore::new();
        let mut rx = store.subscribe();
        let batch = Uuid::new_v4();
        let count = store
            .restore(vec![sample_input(batch), sample_input(batch)])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
    }
}
