//! Workflow state for one calibration job
//!
//! Stage progression:
//! PRE → A (Repeatability) → B (Reproducibility) → C (Output Drive)
//! → D (Drive Interface) → E (Loading Point) → POST
//!
//! Transition logic lives in [`crate::workflow::state_machine`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use torquecal_common::events::StageId;
use uuid::Uuid;

/// Lifecycle of the job as far as the worksheet is concerned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    InProgress,
    Completed,
    Terminated,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

/// Stage transition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub job_id: Uuid,
    pub from: StageId,
    pub to: StageId,
    pub transitioned_at: DateTime<Utc>,
}

/// Workflow position and per-stage validity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub job_id: Uuid,
    pub current_stage: StageId,
    pub stage_validity: BTreeMap<StageId, bool>,
    /// Stages the user has advanced past
    pub completed_stages: BTreeSet<StageId>,
    pub status: JobStatus,
    /// Record lock held by someone else; injected, never owned
    pub is_locked: bool,
}

impl WorkflowState {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            current_stage: StageId::PreCheck,
            stage_validity: StageId::ALL.iter().map(|s| (*s, false)).collect(),
            completed_stages: BTreeSet::new(),
            status: JobStatus::InProgress,
            is_locked: false,
        }
    }

    pub fn is_valid(&self, stage: StageId) -> bool {
        self.stage_validity.get(&stage).copied().unwrap_or(false)
    }

    /// Fraction of stages currently valid (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        let valid = self.stage_validity.values().filter(|v| **v).count();
        valid as f64 / StageId::ALL.len() as f64
    }
}
