//! Draft snapshot sent to the backend
//!
//! Snapshots are whole-state, not deltas: the reconciler compares the
//! current snapshot with the last acknowledged one by deep equality and sends
//! the whole thing when they differ.

use crate::models::StageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use torquecal_common::events::StageId;
use uuid::Uuid;

/// Serializable projection of workflow state and all stage records
///
/// The lock flag is deliberately absent: lock state belongs to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub job_id: Uuid,
    pub current_stage: StageId,
    pub stage_validity: BTreeMap<StageId, bool>,
    pub stages: Vec<StageRecord>,
}

impl DraftSnapshot {
    pub fn stage(&self, stage: StageId) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Step keys of a stage, empty if the stage is absent
    pub fn step_keys(&self, stage: StageId) -> Vec<u32> {
        self.stage(stage).map(|s| s.step_keys()).unwrap_or_default()
    }

    /// Same snapshot minus one row
    ///
    /// Used to advance the acknowledged baseline after the backend confirms a
    /// step deletion.
    pub fn without_step(&self, stage: StageId, step_key: u32) -> DraftSnapshot {
        let mut next = self.clone();
        if let Some(record) = next.stages.iter_mut().find(|s| s.stage == stage) {
            // Absent keys are fine: the baseline may predate the row
            let _ = record.remove_row(step_key);
        }
        next
    }
}
