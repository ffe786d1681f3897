//! Calibration session
//!
//! One open worksheet: hydrates from the backend, routes every user action
//! through the draft reconciler or the workflow state machine, and keeps the
//! record lock current.

use crate::config::WorksheetConfig;
use crate::models::{
    DraftSnapshot, EnvironmentReading, EnvironmentRecord, EnvironmentSubmission, JobStatus,
    LockStatus, StageTransition, StandardSnapshot, WorkflowState, Worksheet,
};
use crate::services::{
    CalibrationBackend, DraftReconciler, EditOutcome, StandardsStatus,
};
use crate::{WorksheetError, WorksheetResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use torquecal_common::events::{CalibEvent, EnvironmentPhase, EventBus, SaveStatus, StageId};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Async facade over one job's worksheet
///
/// Clones share the same worksheet.
#[derive(Clone)]
pub struct CalibrationSession {
    job_id: Uuid,
    backend: Arc<dyn CalibrationBackend>,
    reconciler: DraftReconciler,
    config: WorksheetConfig,
    event_bus: EventBus,
    shutdown: CancellationToken,
}

impl CalibrationSession {
    /// Open a job
    ///
    /// 1. fetch job and reference data, apply persisted readings
    /// 2. fetch PRE/POST environment checks
    /// 3. fetch the record lock
    /// 4. hydrate the reconciler (no save)
    /// 5. seed default steps through the structural path, or load the
    ///    current standard selection
    pub async fn open(
        job_id: Uuid,
        backend: Arc<dyn CalibrationBackend>,
        config: WorksheetConfig,
        event_bus: EventBus,
    ) -> WorksheetResult<Self> {
        let job = backend.fetch_job(job_id).await?;
        if job.job_id != job_id {
            return Err(WorksheetError::Common(torquecal_common::Error::InvalidInput(
                format!("backend returned job {} for {}", job.job_id, job_id),
            )));
        }
        let mut sheet = Worksheet::from_job(job, config.tolerance_percent)?;

        for phase in [EnvironmentPhase::Pre, EnvironmentPhase::Post] {
            if let Some(record) = backend.fetch_environment(job_id, phase).await? {
                sheet.set_environment(record);
            }
        }

        let lock = backend.fetch_lock(job_id).await?;
        let needs_default_steps = sheet.needs_default_steps();

        let reconciler = DraftReconciler::new(
            Arc::clone(&backend),
            config.reconciler_config(),
            event_bus.clone(),
        );
        reconciler.set_locked(&lock);
        reconciler.hydrate(sheet);

        let session = Self {
            job_id,
            backend,
            reconciler,
            config,
            event_bus,
            shutdown: CancellationToken::new(),
        };

        if lock.is_locked {
            info!(job_id = %job_id, locked_by = ?lock.locked_by, "Worksheet opened read-only");
        }

        if needs_default_steps && !lock.is_locked {
            let steps = session.config.default_steps.clone();
            info!(job_id = %job_id, steps = ?steps, "Seeding default repeatability steps");
            if let Err(e) = session.reconciler.add_steps(StageId::Repeatability, &steps).await {
                warn!(job_id = %job_id, error = %e, "Seeded steps not saved yet, will retry");
            }
        } else if let Err(e) = session.reconciler.load_standards().await {
            warn!(job_id = %job_id, error = %e, "Could not load standards");
        }

        info!(job_id = %job_id, "Calibration session opened");
        Ok(session)
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn config(&self) -> &WorksheetConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Measurement edits
    // ------------------------------------------------------------------

    pub fn set_reading(
        &self,
        stage: StageId,
        step_key: u32,
        slot: usize,
        value: impl Into<String>,
    ) -> WorksheetResult<EditOutcome> {
        self.reconciler.set_reading(stage, step_key, slot, value)
    }

    pub fn clear_row(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        self.reconciler.clear_row(stage, step_key)
    }

    pub async fn add_step(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        self.reconciler.add_step(stage, step_key).await
    }

    pub async fn remove_step(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        self.reconciler.remove_step(stage, step_key).await
    }

    pub async fn save_now(&self) -> WorksheetResult<EditOutcome> {
        self.reconciler.save_now().await
    }

    pub async fn recompute_standards(&self) -> WorksheetResult<StandardSnapshot> {
        self.reconciler.recompute_standards().await
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn advance(&self) -> WorksheetResult<StageTransition> {
        self.navigate(|state| state.advance())
    }

    pub fn go_back(&self) -> WorksheetResult<StageTransition> {
        self.navigate(|state| state.go_back())
    }

    pub fn go_to(&self, target: StageId) -> WorksheetResult<StageTransition> {
        self.navigate(|state| state.go_to(target))
    }

    fn navigate(
        &self,
        f: impl FnOnce(&mut WorkflowState) -> WorksheetResult<StageTransition>,
    ) -> WorksheetResult<StageTransition> {
        let transition = self.reconciler.navigate(f)?;
        info!(
            job_id = %self.job_id,
            from = %transition.from,
            to = %transition.to,
            "Stage changed"
        );
        self.event_bus.emit_lossy(CalibEvent::StageChanged {
            job_id: self.job_id,
            from: transition.from,
            to: transition.to,
            timestamp: transition.transitioned_at,
        });
        Ok(transition)
    }

    // ------------------------------------------------------------------
    // Environment checks
    // ------------------------------------------------------------------

    /// Record a PRE/POST environment reading
    ///
    /// The local bounds check is shown while the backend validates; the
    /// backend's record then replaces it. If the backend rejects the write
    /// the previous record is restored.
    pub async fn record_environment(
        &self,
        phase: EnvironmentPhase,
        reading: EnvironmentReading,
    ) -> WorksheetResult<EditOutcome> {
        let local = EnvironmentRecord {
            phase,
            reading,
            validation: self.config.environment_bounds.validate(&reading),
        };
        let Some(previous) = self.reconciler.edit_with(Some(phase.stage()), |sheet| {
            Ok(sheet.replace_environment(phase, Some(local)))
        })?
        else {
            return Ok(EditOutcome::Suppressed);
        };

        let submission = EnvironmentSubmission {
            job_id: self.job_id,
            phase,
            reading,
        };
        let result = self.backend.save_environment(&submission).await;
        match result {
            Ok(record) => {
                info!(
                    job_id = %self.job_id,
                    phase = %phase,
                    is_valid = record.validation.is_valid,
                    "Environment check recorded"
                );
                self.event_bus.emit_lossy(CalibEvent::EnvironmentRecorded {
                    job_id: self.job_id,
                    phase,
                    is_valid: record.validation.is_valid,
                    warnings: record.validation.warnings.clone(),
                    timestamp: Utc::now(),
                });
                self.reconciler.update(|sheet| {
                    sheet.set_environment(record);
                    Ok(())
                })?;
                Ok(EditOutcome::Applied)
            }
            Err(e) => {
                warn!(job_id = %self.job_id, phase = %phase, error = %e, "Environment check rejected");
                self.reconciler.update(|sheet| {
                    sheet.replace_environment(phase, previous);
                    Ok(())
                })?;
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Terminal actions
    // ------------------------------------------------------------------

    /// Complete the job, then trigger the uncertainty calculation
    ///
    /// The latest draft is written first. Any failure up to and including
    /// the completion call leaves the workflow where it was.
    pub async fn finish(&self) -> WorksheetResult<()> {
        self.reject_if_locked()?;
        self.reconciler.read(|sheet| sheet.state.ready_to_finish())??;

        self.reconciler.save_now().await?;

        if let Err(e) = self.backend.complete_job(self.job_id).await {
            error!(job_id = %self.job_id, error = %e, "Job completion failed");
            return Err(e.into());
        }
        self.reconciler.mark_status(JobStatus::Completed)?;
        self.event_bus.emit_lossy(CalibEvent::JobFinished {
            job_id: self.job_id,
            timestamp: Utc::now(),
        });

        if let Err(e) = self.backend.calculate_uncertainty(self.job_id).await {
            warn!(job_id = %self.job_id, error = %e, "Uncertainty calculation failed; job stays completed");
            self.event_bus.emit_lossy(CalibEvent::UncertaintyCalculationFailed {
                job_id: self.job_id,
                message: e.to_string(),
                timestamp: Utc::now(),
            });
        }

        info!(job_id = %self.job_id, "Calibration finished");
        Ok(())
    }

    /// Terminate the job with a reason
    pub async fn terminate(&self, reason: &str) -> WorksheetResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorksheetError::Common(torquecal_common::Error::InvalidInput(
                "termination reason is required".to_string(),
            )));
        }
        self.reject_if_locked()?;
        self.reconciler.read(|sheet| sheet.state.ensure_open())??;

        if let Err(e) = self.backend.terminate_job(self.job_id, reason).await {
            error!(job_id = %self.job_id, error = %e, "Job termination failed");
            return Err(e.into());
        }
        self.reconciler.mark_status(JobStatus::Terminated)?;
        self.event_bus.emit_lossy(CalibEvent::JobTerminated {
            job_id: self.job_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn reject_if_locked(&self) -> WorksheetResult<()> {
        let lock = self.reconciler.lock_status();
        if lock.is_locked {
            return Err(WorksheetError::Locked(lock.locked_by));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Record lock
    // ------------------------------------------------------------------

    /// Apply a lock state; returns true when it changed
    pub fn apply_lock(&self, lock: LockStatus) -> bool {
        let changed = self.reconciler.set_locked(&lock);
        if changed {
            info!(
                job_id = %self.job_id,
                is_locked = lock.is_locked,
                locked_by = ?lock.locked_by,
                "Record lock changed"
            );
            self.event_bus.emit_lossy(CalibEvent::LockChanged {
                job_id: self.job_id,
                is_locked: lock.is_locked,
                locked_by: lock.locked_by,
                timestamp: Utc::now(),
            });
        }
        changed
    }

    /// Poll the backend once and apply the result
    pub async fn refresh_lock(&self) -> WorksheetResult<LockStatus> {
        let lock = self.backend.fetch_lock(self.job_id).await?;
        self.apply_lock(lock.clone());
        Ok(lock)
    }

    /// Poll the lock every `interval` until `cancel` fires or the session
    /// is closed
    pub fn watch_lock(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = session.refresh_lock().await {
                            warn!(job_id = %session.job_id, error = %e, "Lock poll failed");
                        }
                    }
                }
            }
            debug!(job_id = %session.job_id, "Lock watcher stopped");
        })
    }

    /// Stop background work (pending save timer, lock watchers)
    pub fn close(&self) {
        self.reconciler.cancel_pending();
        self.shutdown.cancel();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> WorksheetResult<DraftSnapshot> {
        self.reconciler.snapshot()
    }

    pub fn last_acknowledged(&self) -> Option<DraftSnapshot> {
        self.reconciler.last_acknowledged()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.reconciler.save_status()
    }

    pub fn standards(&self) -> Option<StandardSnapshot> {
        self.reconciler.standards().snapshot()
    }

    pub fn standards_status(&self) -> StandardsStatus {
        self.reconciler.standards().status()
    }

    /// Workflow state as shown to the user; while locked this is the
    /// viewer's own position, not the persisted one
    pub fn workflow_state(&self) -> WorksheetResult<WorkflowState> {
        self.reconciler.workflow_state()
    }

    pub fn lock_status(&self) -> LockStatus {
        self.reconciler.lock_status()
    }

    /// Read the worksheet
    pub fn with_worksheet<T>(&self, f: impl FnOnce(&Worksheet) -> T) -> WorksheetResult<T> {
        self.reconciler.read(f)
    }

    pub fn reconciler(&self) -> &DraftReconciler {
        &self.reconciler
    }
}
