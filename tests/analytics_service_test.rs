//! Aggregation-engine tests
//!
//! Covers:
//! - Batch-level dedup of inspected quantities
//! - Per-process and per-defect-type rates with half-up rounding
//! - Time-window semantics against work dates and creation timestamps
//! - Legacy records without a stored model group

use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::rstest;
use uuid::Uuid;

use qms_api::{
    catalog::Catalog,
    models::{ModelGroup, NO_DEFECT},
    services::analytics::{AnalyticsService, RecordFilter, TimeWindow},
};

mod common;
use common::record;

fn service() -> AnalyticsService {
    AnalyticsService::new(Arc::new(Catalog::default()))
}

#[test]
fn one_batch_with_two_defect_lines_counts_inspection_once() {
    let batch = Uuid::new_v4();
    let records = vec![
        record("1.코팅외관", batch, "스크래치", 3, 100),
        record("1.코팅외관", batch, "찍힘", 2, 100),
    ];

    let stats = service().aggregate(&records);

    assert_eq!(stats.processes.len(), 1);
    let process = &stats.processes[0];
    assert_eq!(process.name, "1.코팅외관");
    assert_eq!(process.inspected, 100);
    assert_eq!(process.faults, 5);
    assert_eq!(process.rate, 5.00);
    assert_eq!(stats.defect_rate, "5.00");
    assert_eq!(stats.pass_rate, 95.0);

    assert_eq!(process.breakdown.len(), 2);
    assert_eq!(process.breakdown[0].defect_type, "스크래치");
    assert_eq!(process.breakdown[0].value, 3);
    assert_eq!(process.breakdown[0].rate, 3.00);
    assert_eq!(process.breakdown[1].defect_type, "찍힘");
    assert_eq!(process.breakdown[1].rate, 2.00);
}

#[test]
fn separate_batches_for_one_process_both_count() {
    let clean = Uuid::new_v4();
    let faulty = Uuid::new_v4();
    let records = vec![
        record("9.조정", clean, NO_DEFECT, 0, 50),
        record("9.조정", faulty, "전류값이상", 4, 80),
    ];

    let stats = service().aggregate(&records);

    let process = &stats.processes[0];
    assert_eq!(process.inspected, 130);
    assert_eq!(process.faults, 4);
    assert_eq!(process.rate, 3.08);
    assert_eq!(stats.total_inspected, 130);
    assert_eq!(stats.defect_rate, "3.08");
}

#[test]
fn dedup_scales_with_line_count_not_quantity() {
    let batch = Uuid::new_v4();
    let records: Vec<_> = (0..7)
        .map(|i| record("13.외관검사", batch, &format!("defect-{i}"), 1, 200))
        .collect();

    let stats = service().aggregate(&records);
    assert_eq!(stats.total_inspected, 200);
    assert_eq!(stats.total_faults, 7);
}

#[test]
fn same_batch_id_across_processes_counts_per_process() {
    // the dedup key is (process, batch_id), not batch_id alone
    let batch = Uuid::new_v4();
    let records = vec![
        record("1.코팅외관", batch, "스크래치", 1, 40),
        record("9.조정", batch, "전류값이상", 1, 40),
    ];

    let stats = service().aggregate(&records);
    assert_eq!(stats.total_inspected, 80);
    assert_eq!(stats.processes.len(), 2);
}

#[test]
fn no_defect_lines_contribute_no_faults_or_breakdown() {
    let records = vec![record("9.조정", Uuid::new_v4(), NO_DEFECT, 0, 75)];

    let stats = service().aggregate(&records);
    let process = &stats.processes[0];
    assert_eq!(process.faults, 0);
    assert_eq!(process.rate, 0.0);
    assert!(process.breakdown.is_empty());
    assert_eq!(stats.pass_rate, 100.0);
}

#[test]
fn processes_keep_encounter_order() {
    let records = vec![
        record("9.조정", Uuid::new_v4(), "a", 1, 10),
        record("1.코팅외관", Uuid::new_v4(), "b", 1, 10),
        record("9.조정", Uuid::new_v4(), "c", 1, 10),
    ];

    let stats = service().aggregate(&records);
    let names: Vec<_> = stats.processes.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["9.조정", "1.코팅외관"]);
}

#[test]
fn empty_input_formats_a_zero_rate() {
    let stats = service().aggregate(&[]);
    assert_eq!(stats.total_inspected, 0);
    assert_eq!(stats.defect_rate, "0.00");
    assert!(stats.processes.is_empty());
}

#[test]
fn day_window_excludes_yesterdays_work_even_if_created_today() {
    let now = Utc::now();
    let svc = service();

    let mut yesterday = record("9.조정", Uuid::new_v4(), "a", 1, 10);
    yesterday.work_date_start = Some((now - Duration::days(1)).date_naive());
    yesterday.created_at = now;

    let filter = RecordFilter {
        window: TimeWindow::Day,
        ..RecordFilter::default()
    };
    assert!(svc.filtered(&[yesterday], &filter, now).is_empty());

    let today = record("9.조정", Uuid::new_v4(), "a", 1, 10);
    assert_eq!(svc.filtered(&[today], &filter, now).len(), 1);
}

#[rstest]
#[case(TimeWindow::Day, 0, true)]
#[case(TimeWindow::Day, 1, false)]
#[case(TimeWindow::Week, 6, true)]
#[case(TimeWindow::Week, 8, false)]
#[case(TimeWindow::Month, 45, false)]
#[case(TimeWindow::Year, 400, false)]
#[case(TimeWindow::All, 4000, true)]
fn windows_test_the_work_date(#[case] window: TimeWindow, #[case] days_ago: i64, #[case] kept: bool) {
    let now = Utc::now();
    let svc = service();

    let mut r = record("9.조정", Uuid::new_v4(), "a", 1, 10);
    r.work_date_start = Some((now - Duration::days(days_ago)).date_naive());

    let filter = RecordFilter {
        window,
        ..RecordFilter::default()
    };
    assert_eq!(svc.filtered(&[r], &filter, now).len(), usize::from(kept));
}

#[test]
fn window_falls_back_to_created_at_when_work_date_missing() {
    let now = Utc::now();
    let svc = service();
    let filter = RecordFilter {
        window: TimeWindow::Week,
        ..RecordFilter::default()
    };

    let mut stale = record("9.조정", Uuid::new_v4(), "a", 1, 10);
    stale.work_date_start = None;
    stale.created_at = now - Duration::days(30);
    assert!(svc.filtered(&[stale], &filter, now).is_empty());

    let mut fresh = record("9.조정", Uuid::new_v4(), "a", 1, 10);
    fresh.work_date_start = None;
    fresh.created_at = now - Duration::days(2);
    assert_eq!(svc.filtered(&[fresh], &filter, now).len(), 1);
}

#[test]
fn group_filter_classifies_legacy_records_from_the_model() {
    let now = Utc::now();
    let svc = service();

    let mut legacy_igs = record("1.코팅외관", Uuid::new_v4(), "코팅불량", 1, 10);
    legacy_igs.model = "UPT900".into();
    legacy_igs.group = None;

    let igs_only = RecordFilter {
        group: Some(ModelGroup::Igs),
        ..RecordFilter::default()
    };
    assert_eq!(svc.filtered(&[legacy_igs.clone()], &igs_only, now).len(), 1);

    let pt_only = RecordFilter {
        group: Some(ModelGroup::PtUpt),
        ..RecordFilter::default()
    };
    assert!(svc.filtered(&[legacy_igs], &pt_only, now).is_empty());
}

#[test]
fn equality_constraints_short_circuit_per_field() {
    let now = Utc::now();
    let svc = service();
    let mut r = record("8.온도보상", Uuid::new_v4(), "증폭 불량", 2, 60);
    r.version = "2.0Ver".into();
    r.temp_equip = "UPT#3".into();
    let records = [r];

    let matching = RecordFilter {
        model: Some("PT850".into()),
        process: Some("8.온도보상".into()),
        range: Some("-15~30psi".into()),
        version: Some("2.0Ver".into()),
        temp_equip: Some("UPT#3".into()),
        ..RecordFilter::default()
    };
    assert_eq!(svc.filtered(&records, &matching, now).len(), 1);

    let wrong_equip = RecordFilter {
        temp_equip: Some("UPT#1".into()),
        ..RecordFilter::default()
    };
    assert!(svc.filtered(&records, &wrong_equip, now).is_empty());
}

#[test]
fn dashboard_applies_filter_before_aggregation() {
    let now = Utc::now();
    let svc = service();
    let records = vec![
        record("9.조정", Uuid::new_v4(), "a", 2, 50),
        record("1.코팅외관", Uuid::new_v4(), "b", 1, 50),
    ];

    let filter = RecordFilter {
        process: Some("9.조정".into()),
        ..RecordFilter::default()
    };
    let stats = svc.dashboard(&records, &filter, now);
    assert_eq!(stats.processes.len(), 1);
    assert_eq!(stats.total_inspected, 50);
    assert_eq!(stats.total_faults, 2);
}
