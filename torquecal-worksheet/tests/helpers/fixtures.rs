//! Sample jobs, standards and configuration

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use torquecal_common::events::{CalibEvent, EnvironmentPhase, EventBus};
use torquecal_worksheet::models::{
    EnvironmentReading, EnvironmentRecord, EnvironmentValidation, Equipment, JobData,
    PersistedStep, ReferencePoint, ReferenceStandard,
};
use torquecal_worksheet::{CalibrationSession, WorksheetConfig};
use uuid::Uuid;

use super::MockBackend;

pub const DEBOUNCE: Duration = Duration::from_millis(1000);

/// 20-100 N·m wrench with a two-point reference table (0 → 0, 100 → 0.5)
pub fn sample_job() -> JobData {
    JobData {
        job_id: Uuid::new_v4(),
        equipment: Equipment {
            equipment_id: Uuid::new_v4(),
            description: "Click torque wrench 20-100 N·m".to_string(),
            min_torque: 20.0,
            max_torque: 100.0,
            unit: "N·m".to_string(),
        },
        calibration_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        reference_table: vec![
            ReferencePoint::new(0.0, 0.0),
            ReferencePoint::new(100.0, 0.5),
        ],
        steps: Vec::new(),
        current_stage: None,
    }
}

/// Job with repeatability steps 20 and 60 already persisted
pub fn job_with_steps() -> JobData {
    let mut job = sample_job();
    job.steps = vec![
        PersistedStep {
            stage: torquecal_common::events::StageId::Repeatability,
            step_key: 20,
            readings: vec!["20.1".into(); 5],
        },
        PersistedStep {
            stage: torquecal_common::events::StageId::Repeatability,
            step_key: 60,
            readings: Vec::new(),
        },
    ];
    job
}

pub fn standard(name: &str, range_max: f64) -> ReferenceStandard {
    ReferenceStandard {
        standard_id: Uuid::new_v4(),
        name: name.to_string(),
        serial_number: format!("SN-{}", name),
        range_min: 0.0,
        range_max,
        unit: "N·m".to_string(),
        certificate_number: None,
        due_date: None,
    }
}

pub fn valid_environment(phase: EnvironmentPhase) -> EnvironmentRecord {
    EnvironmentRecord {
        phase,
        reading: EnvironmentReading {
            temperature_c: 22.5,
            humidity_pct: 45.0,
        },
        validation: EnvironmentValidation {
            is_valid: true,
            warnings: Vec::new(),
        },
    }
}

pub fn test_config() -> WorksheetConfig {
    WorksheetConfig {
        debounce: DEBOUNCE,
        ..WorksheetConfig::default()
    }
}

/// Open a session against `backend` with the default test config
pub async fn open_session(backend: &Arc<MockBackend>) -> CalibrationSession {
    open_session_with(backend, test_config()).await
}

pub async fn open_session_with(
    backend: &Arc<MockBackend>,
    config: WorksheetConfig,
) -> CalibrationSession {
    let job_id = backend.job_id();
    CalibrationSession::open(job_id, backend.clone(), config, EventBus::new(64))
        .await
        .expect("session opens")
}

/// Open a session and return a receiver subscribed before hydration
pub async fn open_session_observed(
    backend: &Arc<MockBackend>,
    config: WorksheetConfig,
) -> (CalibrationSession, broadcast::Receiver<CalibEvent>) {
    let bus = EventBus::new(64);
    let rx = bus.subscribe();
    let session = CalibrationSession::open(backend.job_id(), backend.clone(), config, bus)
        .await
        .expect("session opens");
    (session, rx)
}

/// Everything currently buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<CalibEvent>) -> Vec<CalibEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
