//! Batch submission: one operator entry covering one inspected quantity for
//! one process, expanded into one stored record per defect line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::Catalog;
use crate::errors::ServiceError;
use crate::models::{DefectLine, DefectRecordInput, NO_DEFECT};
use crate::store::DefectStore;

/// Draft defect-line list as the operator builds it up.
///
/// The no-defect sentinel and real defect lines are mutually exclusive, and
/// the rule is enforced here at mutation time rather than at submit time:
/// marking no-defect clears prior entries, and adding a real line drops any
/// sentinel entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftLines {
    lines: Vec<DefectLine>,
}

impl DraftLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a defect line, displacing any no-defect sentinel.
    pub fn push(&mut self, line: DefectLine) {
        if line.is_no_defect() {
            self.mark_no_defect();
            return;
        }
        self.lines.retain(|l| !l.is_no_defect());
        self.lines.push(line);
    }

    /// Replace the list with the single synthetic no-defect line.
    pub fn mark_no_defect(&mut self) {
        self.lines.clear();
        self.lines.push(DefectLine::no_defect());
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    pub fn lines(&self) -> &[DefectLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<DefectLine> {
        self.lines
    }
}

/// One operator submission: shared header fields plus the defect lines.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub model: String,
    pub process: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub sensor_thickness: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub temp_equip: String,
    #[serde(default)]
    pub aging_equip: String,
    #[validate(length(min = 1, message = "operator is required"))]
    pub operator: String,
    #[serde(default)]
    pub remark: String,
    /// Total units inspected in the batch.
    #[validate(range(min = 1, message = "inspected quantity must be positive"))]
    pub batch_inspection_qty: u32,
    pub work_date_start: NaiveDate,
    pub work_date_end: NaiveDate,
    #[validate(length(min = 1, message = "at least one defect line is required"))]
    pub lines: Vec<DefectLine>,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub batch_id: Uuid,
    /// Number of records created, one per defect line.
    pub created: usize,
}

/// Expands submissions into per-line records and writes them as a unit.
pub struct SubmissionService {
    store: Arc<dyn DefectStore>,
    catalog: Arc<Catalog>,
    session_id: String,
    in_flight: AtomicBool,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn DefectStore>, catalog: Arc<Catalog>, session_id: String) -> Self {
        Self {
            store,
            catalog,
            session_id,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Submit one batch. All line records are created concurrently and the
    /// submission succeeds only if every create succeeds; a failure of any
    /// line is reported as one batch failure. Lines that already committed
    /// stay in the store (accepted at-least-once risk, no compensation), so
    /// the caller may retry with the same form state.
    pub async fn submit(&self, submission: NewSubmission) -> Result<SubmissionReceipt, ServiceError> {
        self.check(&submission)?;

        // One submission at a time per session; a retry while the previous
        // one is in flight would mint a second batch id for the same entry.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::Conflict(
                "a submission is already in flight".into(),
            ));
        }
        let result = self.dispatch(submission).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn check(&self, submission: &NewSubmission) -> Result<(), ServiceError> {
        submission.validate()?;
        if submission.operator.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "operator must not be blank".into(),
            ));
        }
        if submission.work_date_start > submission.work_date_end {
            return Err(ServiceError::ValidationError(
                "work date start must not be after work date end".into(),
            ));
        }
        let sentinel_lines = submission
            .lines
            .iter()
            .filter(|l| l.is_no_defect())
            .count();
        if sentinel_lines > 0 && submission.lines.len() > 1 {
            return Err(ServiceError::ValidationError(
                "the no-defect line cannot be combined with defect lines".into(),
            ));
        }
        if submission
            .lines
            .iter()
            .any(|l| l.is_no_defect() && l.quantity != 0)
        {
            return Err(ServiceError::ValidationError(
                "the no-defect line must carry quantity 0".into(),
            ));
        }
        Ok(())
    }

    /// Build one record input per defect line, all sharing a fresh batch id
    /// and the header fields. Equipment and version fields are blanked when
    /// the process family does not call for them, so stale form state never
    /// reaches storage.
    fn expand(&self, submission: &NewSubmission, batch_id: Uuid) -> Vec<DefectRecordInput> {
        let group = self.catalog.group_of(&submission.model);
        let fields = self.catalog.applicable_fields(&submission.process);
        let gate = |wanted: bool, value: &str| {
            if wanted {
                value.to_string()
            } else {
                String::new()
            }
        };

        submission
            .lines
            .iter()
            .map(|line| DefectRecordInput {
                batch_id,
                group: Some(group),
                model: submission.model.clone(),
                process: submission.process.clone(),
                range: submission.range.clone(),
                connection_type: submission.connection_type.clone(),
                sensor_thickness: submission.sensor_thickness.clone(),
                version: gate(fields.version, &submission.version),
                temp_equip: gate(fields.temp_equip, &submission.temp_equip),
                aging_equip: gate(fields.aging_equip, &submission.aging_equip),
                operator: submission.operator.trim().to_string(),
                remark: submission.remark.clone(),
                defect_type: line.defect_type.clone(),
                quantity: line.quantity,
                batch_inspection_qty: submission.batch_inspection_qty,
                work_date_start: Some(submission.work_date_start),
                work_date_end: Some(submission.work_date_end),
                owner_id: self.session_id.clone(),
            })
            .collect()
    }

    async fn dispatch(&self, submission: NewSubmission) -> Result<SubmissionReceipt, ServiceError> {
        let batch_id = Uuid::new_v4();
        let inputs = self.expand(&submission, batch_id);
        let created = inputs.len();
        info!(
            %batch_id,
            process = %submission.process,
            model = %submission.model,
            lines = created,
            inspected = submission.batch_inspection_qty,
            "submitting inspection batch"
        );

        try_join_all(inputs.into_iter().map(|input| self.store.create(input)))
            .await
            .map_err(|e| {
                warn!(%batch_id, error = %e, "batch submission failed");
                ServiceError::StoreError(e)
            })?;

        Ok(SubmissionReceipt { batch_id, created })
    }
}
