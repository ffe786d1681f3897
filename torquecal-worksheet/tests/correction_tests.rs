//! Correction engine tests
//!
//! Exercises the all-or-nothing rule and the non-negative correction policy
//! over a spread of inputs, plus stage metrics built on top of them.

use torquecal_common::events::StageId;
use torquecal_worksheet::models::{
    Equipment, JobData, PersistedStep, ReferencePoint, ReferenceTable, Worksheet,
};
use torquecal_worksheet::services::correction::{
    correct, correct_slots, interpolate_correction, DEFAULT_TOLERANCE_PERCENT,
};
use uuid::Uuid;

fn table() -> ReferenceTable {
    ReferenceTable::new(vec![
        ReferencePoint::new(10.0, 1.0),
        ReferencePoint::new(20.0, 2.0),
    ])
}

fn slots(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_any_blank_slot_nulls_every_derived_value() {
    let t = table();
    for blank in 0..5 {
        for filler in ["", " ", "n/a", "1,5", "NaN"] {
            let mut row = slots(&["15", "15", "15", "15", "15"]);
            row[blank] = filler.to_string();
            assert!(
                correct_slots(&row, 5, &t, 15.0).is_none(),
                "slot {} = {:?} should block computation",
                blank,
                filler
            );
        }
    }
}

#[test]
fn test_mean_is_arithmetic_mean() {
    let cases: [[f64; 5]; 4] = [
        [1.0, 2.0, 3.0, 4.0, 5.0],
        [20.1, 20.1, 20.1, 20.1, 20.1],
        [-3.0, 3.0, -3.0, 3.0, 0.0],
        [99.5, 100.5, 100.0, 101.0, 99.0],
    ];
    let t = table();
    for readings in cases {
        let expected = readings.iter().sum::<f64>() / 5.0;
        let result = correct(&readings, &t, 100.0).unwrap();
        assert!((result.mean - expected).abs() < 1e-12);
        assert!((result.corrected_mean - (result.mean - result.correction)).abs() < 1e-12);
    }
}

#[test]
fn test_correction_never_negative() {
    let tables = [
        table(),
        ReferenceTable::new(vec![
            ReferencePoint::new(0.0, -0.4),
            ReferencePoint::new(50.0, 0.6),
            ReferencePoint::new(100.0, -1.2),
        ]),
        ReferenceTable::new(vec![ReferencePoint::new(40.0, -2.0)]),
        ReferenceTable::default(),
    ];
    for t in &tables {
        for step in 0..=240 {
            let value = f64::from(step) * 0.5 - 10.0;
            let correction = interpolate_correction(t, value);
            assert!(correction >= 0.0, "correction {} at {}", correction, value);
        }
    }
}

#[test]
fn test_interpolation_boundaries() {
    let t = table();
    assert!((interpolate_correction(&t, 15.0) - 1.5).abs() < 1e-12);
    assert_eq!(interpolate_correction(&t, 5.0), 1.0);
    assert_eq!(interpolate_correction(&t, 25.0), 2.0);
    // Exact hit on a control point
    assert_eq!(interpolate_correction(&t, 20.0), 2.0);
}

#[test]
fn test_duplicate_keys_resolve_to_first_point() {
    let t = ReferenceTable::new(vec![
        ReferencePoint::new(10.0, 1.0),
        ReferencePoint::new(10.0, 9.0),
        ReferencePoint::new(20.0, 2.0),
    ]);
    assert_eq!(interpolate_correction(&t, 10.0), 1.0);
}

#[test]
fn test_deviation_pass_boundary() {
    let empty = ReferenceTable::default();
    let at_limit = correct(&[104.0; 5], &empty, 100.0).unwrap();
    assert!((at_limit.deviation_percent - 4.0).abs() < 1e-12);
    assert!(at_limit.passes(DEFAULT_TOLERANCE_PERCENT));

    let over = correct(&[104.01; 5], &empty, 100.0).unwrap();
    assert!(!over.passes(DEFAULT_TOLERANCE_PERCENT));

    let zero_target = correct(&[5.0; 5], &empty, 0.0).unwrap();
    assert_eq!(zero_target.deviation_percent, 0.0);
}

#[test]
fn test_same_inputs_same_outputs() {
    let t = table();
    let row = slots(&["14.9", "15.1", "15", "15.2", "14.8"]);
    let first = correct_slots(&row, 5, &t, 15.0);
    let second = correct_slots(&row, 5, &t, 15.0);
    assert_eq!(first, second);
}

fn wrench_job() -> JobData {
    JobData {
        job_id: Uuid::new_v4(),
        equipment: Equipment {
            equipment_id: Uuid::new_v4(),
            description: "Dial wrench 20-100 N·m".to_string(),
            min_torque: 20.0,
            max_torque: 100.0,
            unit: "N·m".to_string(),
        },
        calibration_date: chrono::NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        reference_table: Vec::new(),
        steps: Vec::new(),
        current_stage: None,
    }
}

#[test]
fn test_stage_metrics_follow_rows() {
    let mut job = wrench_job();
    job.steps = vec![
        PersistedStep {
            stage: StageId::Reproducibility,
            step_key: 1,
            readings: vec!["20.0".into(); 5],
        },
        PersistedStep {
            stage: StageId::Reproducibility,
            step_key: 2,
            readings: vec!["20.4".into(); 5],
        },
        PersistedStep {
            stage: StageId::Reproducibility,
            step_key: 3,
            readings: vec!["19.8".into(); 5],
        },
    ];
    let mut sheet = Worksheet::from_job(job, 4.0).unwrap();

    // One sequence still empty: no spread yet
    let b = StageId::Reproducibility;
    assert_eq!(sheet.stage(b).unwrap().metric_value(), None);

    for slot in 0..5 {
        sheet.set_reading(b, 4, slot, "20.1").unwrap();
    }
    let spread = sheet.stage(b).unwrap().metric_value().unwrap();
    assert!((spread - 0.6).abs() < 1e-9);

    // Loading point compares its two positions
    let e = StageId::LoadingPoint;
    for slot in 0..10 {
        sheet.set_reading(e, 1, slot, "20.5").unwrap();
        sheet.set_reading(e, 2, slot, "20.2").unwrap();
    }
    let difference = sheet.stage(e).unwrap().metric_value().unwrap();
    assert!((difference - 0.3).abs() < 1e-9);
}
