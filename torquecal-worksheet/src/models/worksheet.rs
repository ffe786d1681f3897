//! Worksheet aggregate
//!
//! Everything the user edits for one job: workflow state, the five
//! measurement stages, the PRE/POST environment checks and the reference
//! table used for corrections. Pure and synchronous; the draft reconciler
//! owns the instance and decides what reaches the backend.

use crate::models::{
    DraftSnapshot, EnvironmentRecord, Equipment, JobData, MeasurementRow, ReferenceTable,
    StageLayout, StageRecord, StandardsRequest, WorkflowState,
};
use crate::{WorksheetError, WorksheetResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use torquecal_common::events::{EnvironmentPhase, StageId};
use tracing::{debug, warn};

/// Largest percentage a repeatability step may take
pub const MAX_STEP_PERCENT: u32 = 100;

/// In-memory worksheet for one job
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    pub state: WorkflowState,
    equipment: Equipment,
    calibration_date: NaiveDate,
    reference: ReferenceTable,
    stages: BTreeMap<StageId, StageRecord>,
    pre_environment: Option<EnvironmentRecord>,
    post_environment: Option<EnvironmentRecord>,
    tolerance_percent: f64,
}

impl Worksheet {
    /// Build the worksheet from a job payload
    ///
    /// Persisted readings are applied; rows that no longer fit the layout are
    /// skipped with a warning. Default repeatability steps are not seeded
    /// here, see [`Worksheet::needs_default_steps`].
    pub fn from_job(job: JobData, tolerance_percent: f64) -> WorksheetResult<Worksheet> {
        let reference = ReferenceTable::new(job.reference_table);
        let mut state = WorkflowState::new(job.job_id);
        if let Some(stage) = job.current_stage {
            state.current_stage = stage;
            // Everything before the saved position has been passed already
            state.completed_stages = StageId::ALL.iter().copied().filter(|s| *s < stage).collect();
        }

        let stages = StageId::MEASUREMENT
            .iter()
            .filter_map(|id| StageLayout::for_stage(*id))
            .map(|layout| (layout.stage, StageRecord::initialise(&layout, &job.equipment)))
            .collect();

        let mut sheet = Worksheet {
            state,
            equipment: job.equipment,
            calibration_date: job.calibration_date,
            reference,
            stages,
            pre_environment: None,
            post_environment: None,
            tolerance_percent,
        };

        for step in &job.steps {
            if !step.stage.is_measurement() {
                warn!(stage = %step.stage, "Ignoring persisted step for non-measurement stage");
                continue;
            }
            let known = sheet
                .stage(step.stage)
                .and_then(|s| s.row(step.step_key))
                .is_some();
            if sheet.is_dynamic(step.stage) && !known {
                if let Err(e) = sheet.insert_step(step.stage, step.step_key) {
                    warn!(stage = %step.stage, step_key = step.step_key, error = %e, "Ignoring persisted step");
                    continue;
                }
            }
            let table = &sheet.reference;
            let loaded = sheet
                .stages
                .get_mut(&step.stage)
                .ok_or(WorksheetError::NotMeasurementStage(step.stage))
                .and_then(|record| {
                    record.with_row(step.step_key, |row| {
                        row.load_readings(&step.readings, table);
                        Ok(())
                    })
                });
            if let Err(e) = loaded {
                warn!(stage = %step.stage, step_key = step.step_key, error = %e, "Ignoring persisted step");
            }
        }

        sheet.refresh_validity();
        debug!(job_id = %sheet.job_id(), persisted_steps = job.steps.len(), "Worksheet built");
        Ok(sheet)
    }

    /// True when the repeatability stage has no steps yet
    pub fn needs_default_steps(&self) -> bool {
        self.stage(StageId::Repeatability)
            .map(|s| s.rows().is_empty())
            .unwrap_or(false)
    }

    pub fn job_id(&self) -> uuid::Uuid {
        self.state.job_id
    }

    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub fn calibration_date(&self) -> NaiveDate {
        self.calibration_date
    }

    pub fn reference(&self) -> &ReferenceTable {
        &self.reference
    }

    pub fn tolerance_percent(&self) -> f64 {
        self.tolerance_percent
    }

    pub fn stage(&self, stage: StageId) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.values()
    }

    pub fn environment(&self, phase: EnvironmentPhase) -> Option<&EnvironmentRecord> {
        match phase {
            EnvironmentPhase::Pre => self.pre_environment.as_ref(),
            EnvironmentPhase::Post => self.post_environment.as_ref(),
        }
    }

    /// Whether the environment check for `phase` currently passes
    pub fn environment_valid(&self, phase: EnvironmentPhase) -> bool {
        self.environment(phase)
            .map(|r| r.validation.is_valid)
            .unwrap_or(false)
    }

    pub fn is_dynamic(&self, stage: StageId) -> bool {
        StageLayout::for_stage(stage)
            .map(|l| l.is_dynamic())
            .unwrap_or(false)
    }

    /// Serializable projection for draft writes
    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            job_id: self.state.job_id,
            current_stage: self.state.current_stage,
            stage_validity: self.state.stage_validity.clone(),
            stages: self.stages.values().cloned().collect(),
        }
    }

    /// Auto-select request for this job
    pub fn standards_request(&self) -> StandardsRequest {
        StandardsRequest {
            job_id: self.state.job_id,
            equipment_id: self.equipment.equipment_id,
            calibration_date: self.calibration_date,
        }
    }

    /// Update one reading slot
    pub fn set_reading(
        &mut self,
        stage: StageId,
        step_key: u32,
        slot: usize,
        value: impl Into<String>,
    ) -> WorksheetResult<()> {
        let value = value.into();
        let table = &self.reference;
        self.stages
            .get_mut(&stage)
            .ok_or(WorksheetError::NotMeasurementStage(stage))?
            .with_row(step_key, |row| row.set_reading(slot, value, table))?;
        self.refresh_validity();
        Ok(())
    }

    /// Blank every reading of one row
    pub fn clear_row(&mut self, stage: StageId, step_key: u32) -> WorksheetResult<()> {
        let table = &self.reference;
        self.stages
            .get_mut(&stage)
            .ok_or(WorksheetError::NotMeasurementStage(stage))?
            .with_row(step_key, |row| {
                row.clear(table);
                Ok(())
            })?;
        self.refresh_validity();
        Ok(())
    }

    /// Enable a step on a dynamic stage
    pub fn insert_step(&mut self, stage: StageId, step_key: u32) -> WorksheetResult<()> {
        let layout = self.dynamic_layout(stage)?;
        if step_key == 0 || step_key > MAX_STEP_PERCENT {
            return Err(WorksheetError::InvalidStepKey { stage, step_key });
        }

        let row = MeasurementRow::new(
            step_key,
            layout.target_for(step_key, &self.equipment),
            layout.readings_per_row,
            self.equipment.unit.clone(),
        );
        self.stage_mut(stage)?.insert_row(row)?;
        self.refresh_validity();
        Ok(())
    }

    /// Disable a step on a dynamic stage
    pub fn remove_step(&mut self, stage: StageId, step_key: u32) -> WorksheetResult<MeasurementRow> {
        self.dynamic_layout(stage)?;
        let row = self.stage_mut(stage)?.remove_row(step_key)?;
        self.refresh_validity();
        Ok(row)
    }

    /// Store an environment record (local or backend-validated)
    pub fn set_environment(&mut self, record: EnvironmentRecord) {
        let phase = record.phase;
        self.replace_environment(phase, Some(record));
    }

    /// Swap the record for `phase`, returning the previous one
    pub fn replace_environment(
        &mut self,
        phase: EnvironmentPhase,
        record: Option<EnvironmentRecord>,
    ) -> Option<EnvironmentRecord> {
        let previous = match phase {
            EnvironmentPhase::Pre => std::mem::replace(&mut self.pre_environment, record),
            EnvironmentPhase::Post => std::mem::replace(&mut self.post_environment, record),
        };
        self.refresh_validity();
        previous
    }

    /// Recompute `stage_validity` from rows and environment checks
    pub fn refresh_validity(&mut self) {
        for stage in StageId::ALL {
            let valid = match stage.environment_phase() {
                Some(phase) => self.environment_valid(phase),
                None => self
                    .stages
                    .get(&stage)
                    .map(|s| s.is_valid(self.tolerance_percent))
                    .unwrap_or(false),
            };
            self.state.stage_validity.insert(stage, valid);
        }
    }

    fn stage_mut(&mut self, stage: StageId) -> WorksheetResult<&mut StageRecord> {
        self.stages
            .get_mut(&stage)
            .ok_or(WorksheetError::NotMeasurementStage(stage))
    }

    fn dynamic_layout(&self, stage: StageId) -> WorksheetResult<StageLayout> {
        StageLayout::for_stage(stage)
            .filter(|l| l.is_dynamic())
            .ok_or(WorksheetError::NotDynamicStage(stage))
    }
}
