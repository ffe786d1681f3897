//! Job payloads exchanged with the backend

use crate::models::ReferencePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use torquecal_common::events::StageId;
use uuid::Uuid;

/// Torque tool under calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub equipment_id: Uuid,
    pub description: String,
    /// Lowest specified torque
    pub min_torque: f64,
    /// Highest specified torque
    pub max_torque: f64,
    pub unit: String,
}

/// Readings persisted for one row in an earlier session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStep {
    pub stage: StageId,
    pub step_key: u32,
    #[serde(default)]
    pub readings: Vec<String>,
}

/// Job plus reference data, as returned by the worksheet `GET`
///
/// An empty `steps` list means nothing has been measured yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub job_id: Uuid,
    pub equipment: Equipment,
    pub calibration_date: NaiveDate,
    #[serde(default)]
    pub reference_table: Vec<ReferencePoint>,
    #[serde(default)]
    pub steps: Vec<PersistedStep>,
    /// Stage the user was on when the draft was last saved
    #[serde(default)]
    pub current_stage: Option<StageId>,
}

/// Record lock as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub is_locked: bool,
    #[serde(default)]
    pub locked_by: Option<String>,
}

impl LockStatus {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn held_by(user: impl Into<String>) -> Self {
        Self {
            is_locked: true,
            locked_by: Some(user.into()),
        }
    }
}

/// Body of the step `DELETE`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteStepRequest {
    pub job_id: Uuid,
    pub stage: StageId,
    pub step_key: u32,
}
