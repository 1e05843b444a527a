use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Sentinel defect type meaning "batch passed with zero defects".
///
/// A batch carries either exactly one line with this value and quantity 0, or
/// one-or-more real defect lines, never both.
pub const NO_DEFECT: &str = "불량없음";

/// Model group determining which catalog vocabulary and process list applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
pub enum ModelGroup {
    #[serde(rename = "PT/UPT")]
    #[strum(serialize = "PT/UPT")]
    PtUpt,
    #[serde(rename = "IGS")]
    #[strum(serialize = "IGS")]
    Igs,
}

/// One defect line of a submission: a defect category and how many units
/// showed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefectLine {
    pub defect_type: String,
    pub quantity: u32,
}

impl DefectLine {
    pub fn new(defect_type: impl Into<String>, quantity: u32) -> Self {
        Self {
            defect_type: defect_type.into(),
            quantity,
        }
    }

    /// The synthetic line recorded when a batch had no defects.
    pub fn no_defect() -> Self {
        Self::new(NO_DEFECT, 0)
    }

    pub fn is_no_defect(&self) -> bool {
        self.defect_type == NO_DEFECT
    }
}

/// One persisted defect-entry record.
///
/// Records are append-only: created through the submission service, deleted
/// by id, never mutated. All records sharing `(process, batch_id)` carry the
/// same `batch_inspection_qty`; aggregation counts that quantity exactly once
/// per batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefectRecord {
    /// Storage-assigned identifier.
    pub id: Uuid,
    /// Shared by every line of one submission.
    pub batch_id: Uuid,
    /// Stored group, derived from the model at submission time. Absent on
    /// legacy records; filtering re-derives it from the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ModelGroup>,
    pub model: String,
    pub process: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub sensor_thickness: String,
    /// Populated only for wire-bonding-family processes.
    #[serde(default)]
    pub version: String,
    /// Populated only for temperature-compensation-family processes.
    #[serde(default)]
    pub temp_equip: String,
    /// Populated only for aging-family processes.
    #[serde(default)]
    pub aging_equip: String,
    pub operator: String,
    #[serde(default)]
    pub remark: String,
    /// Either [`NO_DEFECT`] or a defect-category label.
    pub defect_type: String,
    /// Units showing this defect; 0 for the no-defect sentinel.
    #[serde(default)]
    pub quantity: u32,
    /// Total units inspected in the batch, identical across the batch.
    pub batch_inspection_qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_date_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_date_end: Option<NaiveDate>,
    /// Storage-assigned creation timestamp, monotonic per insert. Newest
    /// first is the default display order.
    pub created_at: DateTime<Utc>,
    /// Opaque identifier of the submitting session.
    pub owner_id: String,
}

impl DefectRecord {
    pub fn is_no_defect(&self) -> bool {
        self.defect_type == NO_DEFECT
    }

    /// Instant used for time-window filtering: the work-date start at
    /// midnight UTC, falling back to the creation timestamp when the record
    /// predates work-date capture.
    pub fn window_instant(&self) -> DateTime<Utc> {
        match self.work_date_start {
            Some(date) => date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            None => self.created_at,
        }
    }
}

/// Record shape handed to the store; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectRecordInput {
    pub batch_id: Uuid,
    #[serde(default)]
    pub group: Option<ModelGroup>,
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
    pub operator: String,
    #[serde(default)]
    pub remark: String,
    pub defect_type: String,
    #[serde(default)]
    pub quantity: u32,
    pub batch_inspection_qty: u32,
    #[serde(default)]
    pub work_date_start: Option<NaiveDate>,
    #[serde(default)]
    pub work_date_end: Option<NaiveDate>,
    pub owner_id: String,
}

impl DefectRecordInput {
    /// Materialize a stored record with the storage-assigned fields.
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> DefectRecord {
        DefectRecord {
            id,
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
            created_at,
            owner_id: self.owner_id,
        }
    }
}
