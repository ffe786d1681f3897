//! Stage workflow state machine
//!
//! PRE → A → B → C → D → E → POST
//!
//! Backward moves are free. Forward moves apply the exit gate of every stage
//! they cross: PRE may only be left with a valid pre-check environment, and
//! POST is only left by finishing, which needs a valid post-check. Leaving a
//! stage forward marks it completed.

use crate::models::{JobStatus, StageTransition, WorkflowState};
use crate::{WorksheetError, WorksheetResult};
use chrono::Utc;
use torquecal_common::events::StageId;

impl WorkflowState {
    /// Fails once the job has been finished or terminated
    pub fn ensure_open(&self) -> WorksheetResult<()> {
        if self.status.is_terminal() {
            return Err(WorksheetError::JobClosed(self.status));
        }
        Ok(())
    }

    /// Exit gate for leaving `stage` forward
    pub fn check_exit_gate(&self, stage: StageId) -> WorksheetResult<()> {
        match stage.environment_phase() {
            Some(phase) if !self.is_valid(stage) => Err(WorksheetError::GateBlocked {
                stage,
                reason: format!("{} environment check is missing or out of bounds", phase),
            }),
            _ => Ok(()),
        }
    }

    /// Move to the next stage
    pub fn advance(&mut self) -> WorksheetResult<StageTransition> {
        self.ensure_open()?;
        let next = self.current_stage.next().ok_or_else(|| {
            WorksheetError::InvalidTransition(format!(
                "{} is the last stage; finish the job instead",
                self.current_stage
            ))
        })?;
        self.check_exit_gate(self.current_stage)?;
        self.completed_stages.insert(self.current_stage);
        Ok(self.transition_to(next))
    }

    /// Move to the previous stage
    pub fn go_back(&mut self) -> WorksheetResult<StageTransition> {
        self.ensure_open()?;
        let previous = self.current_stage.previous().ok_or_else(|| {
            WorksheetError::InvalidTransition(format!("{} is the first stage", self.current_stage))
        })?;
        Ok(self.transition_to(previous))
    }

    /// Jump to any stage, applying every gate crossed on the way forward
    ///
    /// Nothing changes when a gate blocks.
    pub fn go_to(&mut self, target: StageId) -> WorksheetResult<StageTransition> {
        self.ensure_open()?;
        if target == self.current_stage {
            return Err(WorksheetError::InvalidTransition(format!(
                "already on stage {}",
                target
            )));
        }

        if target > self.current_stage {
            let crossed: Vec<StageId> = StageId::ALL
                .iter()
                .copied()
                .filter(|s| *s >= self.current_stage && *s < target)
                .collect();
            for stage in &crossed {
                self.check_exit_gate(*stage)?;
            }
            self.completed_stages.extend(crossed);
        }

        Ok(self.transition_to(target))
    }

    /// Finishing is allowed from POST with a valid post-check
    pub fn ready_to_finish(&self) -> WorksheetResult<()> {
        self.ensure_open()?;
        if self.current_stage != StageId::PostCheck {
            return Err(WorksheetError::InvalidTransition(format!(
                "cannot finish from stage {}",
                self.current_stage
            )));
        }
        self.check_exit_gate(StageId::PostCheck)
    }

    /// Record the terminal status after the backend accepted it
    pub fn close(&mut self, status: JobStatus) {
        if status == JobStatus::Completed {
            self.completed_stages.insert(self.current_stage);
        }
        self.status = status;
    }

    fn transition_to(&mut self, to: StageId) -> StageTransition {
        let transition = StageTransition {
            job_id: self.job_id,
            from: self.current_stage,
            to,
            transitioned_at: Utc::now(),
        };
        self.current_stage = to;
        transition
    }
}
