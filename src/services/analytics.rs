//! Filtering and aggregation over the record snapshot.
//!
//! Everything here is a pure function of (snapshot, filter, now): safe to
//! re-derive on every snapshot push, deterministic, no side effects.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::models::{DefectRecord, ModelGroup};

/// Reporting time window, anchored at the evaluation instant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Quarter,
    Year,
    #[default]
    All,
}

impl TimeWindow {
    /// Inclusive lower bound of the window, `None` when unbounded.
    ///
    /// Day/month/quarter/year snap to calendar boundaries; week is a rolling
    /// seven days from the evaluation instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = |date: NaiveDate| date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        match self {
            TimeWindow::Day => Some(midnight(now.date_naive())),
            TimeWindow::Week => Some(now - Duration::days(7)),
            TimeWindow::Month => {
                Some(midnight(NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap()))
            }
            TimeWindow::Quarter => {
                let quarter_month = (now.month0() / 3) * 3 + 1;
                Some(midnight(
                    NaiveDate::from_ymd_opt(now.year(), quarter_month, 1).unwrap(),
                ))
            }
            TimeWindow::Year => Some(midnight(NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap())),
            TimeWindow::All => None,
        }
    }
}

/// Composite filter over the record set: optional equality constraints plus
/// a time window. Evaluation short-circuits on the first mismatched
/// constraint, then applies the window test.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    pub group: Option<ModelGroup>,
    pub model: Option<String>,
    pub process: Option<String>,
    pub range: Option<String>,
    pub version: Option<String>,
    pub temp_equip: Option<String>,
    #[serde(default)]
    pub window: TimeWindow,
}

impl RecordFilter {
    pub fn matches(&self, catalog: &Catalog, record: &DefectRecord, now: DateTime<Utc>) -> bool {
        if let Some(group) = self.group {
            // legacy records lack a stored group; classify before filtering
            // so they are never silently excluded
            let derived = record
                .group
                .unwrap_or_else(|| catalog.group_of(&record.model));
            if derived != group {
                return false;
            }
        }
        if self.model.as_deref().is_some_and(|m| record.model != m) {
            return false;
        }
        if self.process.as_deref().is_some_and(|p| record.process != p) {
            return false;
        }
        if self.range.as_deref().is_some_and(|r| record.range != r) {
            return false;
        }
        if self.version.as_deref().is_some_and(|v| record.version != v) {
            return false;
        }
        if self
            .temp_equip
            .as_deref()
            .is_some_and(|e| record.temp_equip != e)
        {
            return false;
        }
        match self.window.cutoff(now) {
            Some(cutoff) => record.window_instant() >= cutoff,
            None => true,
        }
    }
}

/// Percentage with half-up rounding to two decimals; a zero denominator maps
/// to zero rather than an error.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Complement of the defect rate, clamped to [0, 100] so data-entry errors
/// producing more faults than inspected units cannot yield a negative pass
/// rate.
pub fn pass_rate(defect_rate: f64) -> f64 {
    (100.0 - defect_rate).clamp(0.0, 100.0)
}

/// One defect type's contribution within a process.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefectTypeStat {
    #[serde(rename = "type")]
    pub defect_type: String,
    /// Fault units of this type.
    pub value: u64,
    /// Percentage against the process's inspected count.
    pub rate: f64,
}

/// Aggregated statistics for one process stage.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    pub name: String,
    pub inspected: u64,
    pub faults: u64,
    pub rate: f64,
    pub breakdown: Vec<DefectTypeStat>,
}

/// Full dashboard payload: per-process statistics plus grand totals.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Per-process entries in encounter order.
    pub processes: Vec<ProcessStats>,
    pub total_inspected: u64,
    pub total_faults: u64,
    /// Grand-total defect rate, formatted to exactly two decimals.
    pub defect_rate: String,
    pub pass_rate: f64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Default)]
struct ProcessBucket {
    faults: u64,
    inspected: u64,
    breakdown: HashMap<String, u64>,
    breakdown_order: Vec<String>,
}

/// Analytics service folding record snapshots into dashboard statistics.
pub struct AnalyticsService {
    catalog: Arc<Catalog>,
}

impl AnalyticsService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Records passing the composite filter, in snapshot order.
    pub fn filtered<'a>(
        &self,
        records: &'a [DefectRecord],
        filter: &RecordFilter,
        now: DateTime<Utc>,
    ) -> Vec<&'a DefectRecord> {
        records
            .iter()
            .filter(|r| filter.matches(&self.catalog, r, now))
            .collect()
    }

    /// Fold a filtered record sequence into per-process statistics.
    ///
    /// Fault quantities accumulate per defect line, but the batch's
    /// inspected quantity is counted exactly once per `(process, batch_id)`
    /// regardless of how many lines the batch contributes. That dedup is the
    /// correctness core of the whole dashboard: a batch split into k defect
    /// lines must never inflate the denominator k-fold.
    pub fn aggregate<'a, I>(&self, records: I) -> DashboardStats
    where
        I: IntoIterator<Item = &'a DefectRecord>,
    {
        let mut buckets: HashMap<String, ProcessBucket> = HashMap::new();
        let mut process_order: Vec<String> = Vec::new();
        let mut seen_batches: HashSet<(String, Uuid)> = HashSet::new();
        let mut total_faults: u64 = 0;
        let mut total_inspected: u64 = 0;

        for record in records {
            if !buckets.contains_key(&record.process) {
                process_order.push(record.process.clone());
            }
            let bucket = buckets.entry(record.process.clone()).or_default();

            if !record.is_no_defect() {
                let quantity = u64::from(record.quantity);
                bucket.faults += quantity;
                total_faults += quantity;
                if !bucket.breakdown.contains_key(&record.defect_type) {
                    bucket.breakdown_order.push(record.defect_type.clone());
                }
                *bucket.breakdown.entry(record.defect_type.clone()).or_insert(0) += quantity;
            }

            let batch_key = (record.process.clone(), record.batch_id);
            if seen_batches.insert(batch_key) {
                let inspected = u64::from(record.batch_inspection_qty);
                bucket.inspected += inspected;
                total_inspected += inspected;
            }
        }

        let processes = process_order
            .into_iter()
            .map(|name| {
                let bucket = buckets.remove(&name).unwrap_or_default();
                let breakdown = bucket
                    .breakdown_order
                    .iter()
                    .map(|defect_type| {
                        let value = bucket.breakdown[defect_type];
                        DefectTypeStat {
                            defect_type: defect_type.clone(),
                            value,
                            rate: rate(value, bucket.inspected),
                        }
                    })
                    .collect();
                ProcessStats {
                    rate: rate(bucket.faults, bucket.inspected),
                    inspected: bucket.inspected,
                    faults: bucket.faults,
                    breakdown,
                    name,
                }
            })
            .collect();

        let total_rate = rate(total_faults, total_inspected);
        DashboardStats {
            processes,
            total_inspected,
            total_faults,
            defect_rate: format!("{:.2}", total_rate),
            pass_rate: pass_rate(total_rate),
            generated_at: Utc::now(),
        }
    }

    /// Filter then aggregate: the whole dashboard in one call.
    pub fn dashboard(
        &self,
        records: &[DefectRecord],
        filter: &RecordFilter,
        now: DateTime<Utc>,
    ) -> DashboardStats {
        self.aggregate(self.filtered(records, filter, now))
    }
}
