//! Record listing, deletion, backup export, and restore.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{DefectRecord, DefectRecordInput, ModelGroup};
use crate::store::{DefectStore, StoreError};

/// Tabular-view filter: optional hide-normal toggle plus an inclusive
/// work-date range.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    /// Drop no-defect sentinel rows from the listing.
    #[serde(default)]
    pub hide_normal: bool,
    /// Keep records whose work-date start is on or after this date.
    pub from: Option<NaiveDate>,
    /// Keep records whose work-date end is on or before this date.
    pub to: Option<NaiveDate>,
}

/// Backup entry shape: the record-like object required of every element of a
/// restore payload. Storage-assigned fields (`id`, `createdAt`) are accepted
/// and discarded; batch and process identity are preserved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupRecord {
    batch_id: Uuid,
    #[serde(default)]
    group: Option<ModelGroup>,
    model: String,
    process: String,
    #[serde(default)]
    range: String,
    #[serde(default)]
    connection_type: String,
    #[serde(default)]
    sensor_thickness: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    temp_equip: String,
    #[serde(default)]
    aging_equip: String,
    operator: String,
    #[serde(default)]
    remark: String,
    defect_type: String,
    #[serde(default)]
    quantity: u32,
    batch_inspection_qty: u32,
    #[serde(default)]
    work_date_start: Option<NaiveDate>,
    #[serde(default)]
    work_date_end: Option<NaiveDate>,
}

impl BackupRecord {
    fn into_input(self, owner_id: &str) -> DefectRecordInput {
        DefectRecordInput {
            batch_id: self.batch_id,
            group: self.group,
            model: self.model,
            process: self.process,
            range: self.range,
            connection_type: self.connection_type,
            sensor_thickness: self.sensor_thickness,
            version: self.version,
            temp_equip: self.temp_equip,
            aging_equip: self.aging_equip,
            operator: self.operator,
            remark: self.remark,
            defect_type: self.defect_type,
            quantity: self.quantity,
            batch_inspection_qty: self.batch_inspection_qty,
            work_date_start: self.work_date_start,
            work_date_end: self.work_date_end,
            owner_id: owner_id.to_string(),
        }
    }
}

/// Read-side and maintenance operations over the record set.
pub struct RecordService {
    store: Arc<dyn DefectStore>,
    session_id: String,
}

impl RecordService {
    pub fn new(store: Arc<dyn DefectStore>, session_id: String) -> Self {
        Self { store, session_id }
    }

    /// Flat filtered list for the master log view and CSV-class consumers,
    /// newest first. Records without work dates pass the date filters: the
    /// range only excludes what it can prove is outside it.
    pub fn list(&self, snapshot: &[DefectRecord], filter: &ListFilter) -> Vec<DefectRecord> {
        let mut records: Vec<DefectRecord> = snapshot
            .iter()
            .filter(|r| {
                if filter.hide_normal && r.is_no_defect() {
                    return false;
                }
                if let Some(from) = filter.from {
                    if r.work_date_start.is_some_and(|d| d < from) {
                        return false;
                    }
                }
                if let Some(to) = filter.to {
                    if r.work_date_end.is_some_and(|d| d > to) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Full record set for backup, newest first.
    pub fn export(&self, snapshot: &[DefectRecord]) -> Vec<DefectRecord> {
        self.list(snapshot, &ListFilter::default())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        info!(%id, "deleting defect record");
        self.store.delete(id).await.map_err(|e| match e {
            StoreError::NotFound(id) => ServiceError::NotFound(format!("record {id} not found")),
            other => ServiceError::StoreError(other),
        })
    }

    /// Restore an externally supplied backup payload.
    ///
    /// The whole payload is parsed and validated before the first insert:
    /// any entry that is not a record-like object aborts the restore with
    /// nothing written.
    pub async fn restore(&self, payload: Value) -> Result<usize, ServiceError> {
        let entries = payload.as_array().ok_or_else(|| {
            ServiceError::RestoreFormatError("backup payload must be a JSON array".into())
        })?;

        let mut inputs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let record: BackupRecord = serde_json::from_value(entry.clone()).map_err(|e| {
                warn!(index, error = %e, "rejecting malformed backup entry");
                ServiceError::RestoreFormatError(format!(
                    "entry {index} is not a defect record: {e}"
                ))
            })?;
            inputs.push(record.into_input(&self.session_id));
        }

        info!(records = inputs.len(), "restoring records from backup");
        Ok(self.store.restore(inputs).await?)
    }
}
