//! Reference standard snapshot
//!
//! The set of reference instruments the backend selected for a job. The
//! client only ever displays what the backend returns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One selected reference instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStandard {
    pub standard_id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub range_min: f64,
    pub range_max: f64,
    pub unit: String,
    #[serde(default)]
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Standards currently selected for a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardSnapshot {
    pub job_id: Uuid,
    #[serde(default)]
    pub standards: Vec<ReferenceStandard>,
    #[serde(default)]
    pub selected_at: Option<DateTime<Utc>>,
}

impl StandardSnapshot {
    pub fn empty(job_id: Uuid) -> Self {
        Self {
            job_id,
            standards: Vec::new(),
            selected_at: None,
        }
    }
}

/// Body of the auto-select request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardsRequest {
    pub job_id: Uuid,
    pub equipment_id: Uuid,
    pub calibration_date: NaiveDate,
}

/// Which auto-select verb to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// First selection for the job (`POST`)
    Create,
    /// Replace an existing selection (`PUT`)
    Recompute,
}

/// Status discriminator returned by auto-select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSelectStatus {
    /// Selection stored for the first time
    Success,
    /// Existing selection replaced
    Recomputed,
}

impl AutoSelectStatus {
    /// Parse the wire discriminator; unknown values yield `None`
    pub fn from_wire(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" => Some(AutoSelectStatus::Success),
            "recomputed" => Some(AutoSelectStatus::Recomputed),
            _ => None,
        }
    }
}

/// Auto-select response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSelectResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}
