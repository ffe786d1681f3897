//! Draft reconciliation
//!
//! Write-behind cache between the in-memory [`Worksheet`] and the backend
//! draft. Ordinary edits are coalesced into a trailing-edge debounce window
//! and written as one whole-draft upsert; structural edits (adding or
//! removing repeatability steps) skip the window and round-trip immediately,
//! followed by a standards refresh.
//!
//! Invariants:
//! - The snapshot installed by [`DraftReconciler::hydrate`] is the
//!   acknowledged baseline and never triggers a write.
//! - A debounced save reads the *current* snapshot when it fires and skips
//!   the write when it equals the last acknowledged one.
//! - Draft writes, step deletions and standards refreshes are serialised by
//!   one async write gate.
//! - The worksheet mutex is never held across an await point.
//! - While the record is locked every mutation is suppressed and no timer
//!   writes. Navigation moves a viewer-only copy of the workflow state, so
//!   the snapshot stays unchanged and nothing is flushed on unlock.

use crate::error::BackendError;
use crate::models::{
    DeleteStepRequest, DraftSnapshot, JobStatus, LockStatus, StageTransition, StandardSnapshot,
    StandardsRequest, WorkflowState, Worksheet,
};
use crate::services::{CalibrationBackend, StandardsTrigger};
use crate::{WorksheetError, WorksheetResult};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use torquecal_common::events::{CalibEvent, EventBus, SavePolicy, SaveStatus, StageId};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Reconciler tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Inactivity window before a debounced save fires
    pub debounce: Duration,
    /// Per-stage policy; unlisted stages use debounced auto-save
    pub save_policy: BTreeMap<StageId, SavePolicy>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            save_policy: BTreeMap::new(),
        }
    }
}

impl ReconcilerConfig {
    pub fn policy_for(&self, stage: StageId) -> SavePolicy {
        self.save_policy.get(&stage).copied().unwrap_or_default()
    }
}

/// What happened to a mutation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Applied locally (and queued or written as policy dictates)
    Applied,
    /// Ignored because the record is locked
    Suppressed,
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

struct PendingSave {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Shared {
    sheet: Option<Worksheet>,
    last_acked: Option<DraftSnapshot>,
    status: SaveStatus,
    pending: Option<PendingSave>,
    next_generation: u64,
    busy_stages: HashSet<StageId>,
    /// Step deletions the backend has not confirmed yet
    pending_deletions: Vec<DeleteStepRequest>,
    /// Step set changed on the backend without a standards refresh yet
    standards_pending: bool,
    lock: LockStatus,
    /// Viewer position while locked; never persisted
    view_state: Option<WorkflowState>,
}

impl Shared {
    fn sheet(&self) -> WorksheetResult<&Worksheet> {
        self.sheet.as_ref().ok_or(WorksheetError::NotHydrated)
    }

    fn sheet_mut(&mut self) -> WorksheetResult<&mut Worksheet> {
        self.sheet.as_mut().ok_or(WorksheetError::NotHydrated)
    }

    fn job_id(&self) -> Option<Uuid> {
        self.sheet.as_ref().map(|s| s.job_id())
    }

    /// Admission check shared by every mutation entry point
    fn admit(&self, stage: Option<StageId>) -> WorksheetResult<EditOutcome> {
        let sheet = self.sheet()?;
        if sheet.state.status.is_terminal() {
            return Err(WorksheetError::JobClosed(sheet.state.status));
        }
        if self.lock.is_locked {
            debug!(stage = ?stage, locked_by = ?self.lock.locked_by, "Edit suppressed: record locked");
            return Ok(EditOutcome::Suppressed);
        }
        if let Some(stage) = stage {
            if self.busy_stages.contains(&stage) {
                return Err(WorksheetError::StructuralEditInFlight(stage));
            }
        }
        Ok(EditOutcome::Applied)
    }

    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.cancel.cancel();
                trace!(generation = pending.generation, "Pending save cancelled");
                true
            }
            None => false,
        }
    }

    fn is_dirty(&self) -> bool {
        match (&self.sheet, &self.last_acked) {
            (Some(sheet), Some(acked)) => sheet.snapshot() != *acked,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

struct Inner {
    shared: Mutex<Shared>,
    write_gate: tokio::sync::Mutex<()>,
    backend: Arc<dyn CalibrationBackend>,
    standards: StandardsTrigger,
    config: ReconcilerConfig,
    event_bus: EventBus,
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_status(&self, shared: &mut Shared, status: SaveStatus) {
        if shared.status == status {
            return;
        }
        shared.status = status.clone();
        if let Some(job_id) = shared.job_id() {
            self.event_bus.emit_lossy(CalibEvent::SaveStatusChanged {
                job_id,
                status,
                timestamp: Utc::now(),
            });
        }
    }

    fn fail(&self, error: BackendError, what: &str) -> WorksheetError {
        error!(error = %error, "{} failed", what);
        let mut shared = self.shared();
        self.update_status(
            &mut shared,
            SaveStatus::Error {
                message: error.to_string(),
            },
        );
        error.into()
    }

    /// Flush the draft: retry queued deletions, then write if changed
    ///
    /// A deletion that fails again stays queued and leaves the status at
    /// `Error`, but never holds back the draft write.
    ///
    /// `generation` identifies the debounce timer that fired; a stale timer
    /// does nothing. `None` flushes unconditionally (explicit save).
    async fn flush(&self, generation: Option<u64>) -> WorksheetResult<EditOutcome> {
        let _gate = self.write_gate.lock().await;

        let deletions = {
            let mut shared = self.shared();
            if let Some(generation) = generation {
                if shared.pending.as_ref().map(|p| p.generation) != Some(generation) {
                    trace!(generation, "Superseded debounce timer");
                    return Ok(EditOutcome::Suppressed);
                }
                shared.pending = None;
            }
            shared.sheet()?;
            if shared.lock.is_locked {
                debug!("Draft save skipped: record locked");
                return Ok(EditOutcome::Suppressed);
            }
            shared.pending_deletions.clone()
        };

        let mut deletion_error = None;
        for request in deletions {
            match self.delete_remote(&request).await {
                Ok(()) => {
                    let mut shared = self.shared();
                    shared.pending_deletions.retain(|r| r != &request);
                    shared.last_acked = shared
                        .last_acked
                        .as_ref()
                        .map(|acked| acked.without_step(request.stage, request.step_key));
                    shared.standards_pending = true;
                    info!(stage = %request.stage, step_key = request.step_key, "Queued step deletion confirmed");
                }
                Err(e) => {
                    warn!(stage = %request.stage, step_key = request.step_key, error = %e, "Queued step deletion failed again");
                    if deletion_error.is_none() {
                        deletion_error = Some(e);
                    }
                }
            }
        }

        let snapshot = {
            let mut shared = self.shared();
            if shared.lock.is_locked {
                debug!("Draft save skipped: record locked");
                return Ok(EditOutcome::Suppressed);
            }
            let snapshot = shared.sheet()?.snapshot();
            if shared.last_acked.as_ref() == Some(&snapshot) {
                trace!("Draft unchanged since last acknowledgement");
                if shared.standards_pending {
                    self.update_status(&mut shared, SaveStatus::Saved);
                }
                None
            } else {
                self.update_status(&mut shared, SaveStatus::Saving);
                Some(snapshot)
            }
        };

        if let Some(snapshot) = snapshot {
            self.write_draft(snapshot).await?;
        }

        let refresh = std::mem::take(&mut self.shared().standards_pending);
        if refresh {
            self.refresh_standards().await;
        }

        // The draft went out; the deletion stays queued and visible
        if let Some(e) = deletion_error {
            return Err(self.fail(e, "Step deletion retry"));
        }
        Ok(EditOutcome::Applied)
    }

    /// Upsert one snapshot; caller holds the write gate
    async fn write_draft(&self, snapshot: DraftSnapshot) -> WorksheetResult<()> {
        let result = self.backend.save_draft(&snapshot).await;
        match result {
            Ok(()) => {
                info!(
                    job_id = %snapshot.job_id,
                    stage = %snapshot.current_stage,
                    "Draft saved"
                );
                let mut shared = self.shared();
                shared.last_acked = Some(snapshot);
                self.update_status(&mut shared, SaveStatus::Saved);
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Draft save")),
        }
    }

    /// Delete a step remotely; an already-absent step counts as deleted
    async fn delete_remote(&self, request: &DeleteStepRequest) -> Result<(), BackendError> {
        match self.backend.delete_step(request).await {
            Ok(()) => Ok(()),
            Err(BackendError::NotFound(_)) => {
                debug!(stage = %request.stage, step_key = request.step_key, "Step already absent on backend");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn standards_request(&self) -> Option<StandardsRequest> {
        self.shared().sheet.as_ref().map(|s| s.standards_request())
    }

    /// Refresh standards after a structural change; failure is non-fatal
    async fn refresh_standards(&self) {
        let Some(request) = self.standards_request() else {
            return;
        };
        if let Err(e) = self.standards.refresh(&request).await {
            warn!(job_id = %request.job_id, error = %e, "Step change kept, standards left stale");
        }
    }

    async fn structural_add(&self, stage: StageId) -> WorksheetResult<()> {
        let _gate = self.write_gate.lock().await;

        let snapshot = {
            let mut shared = self.shared();
            if shared.lock.is_locked {
                debug!(stage = %stage, "Record locked mid-edit; step write deferred");
                shared.standards_pending = true;
                return Ok(());
            }
            let snapshot = shared.sheet()?.snapshot();
            self.update_status(&mut shared, SaveStatus::Saving);
            snapshot
        };

        if let Err(e) = self.write_draft(snapshot).await {
            self.shared().standards_pending = true;
            return Err(e);
        }
        self.shared().standards_pending = false;
        self.refresh_standards().await;
        Ok(())
    }

    async fn structural_remove(&self, request: DeleteStepRequest) -> WorksheetResult<()> {
        let _gate = self.write_gate.lock().await;

        {
            let mut shared = self.shared();
            if shared.lock.is_locked {
                debug!(stage = %request.stage, step_key = request.step_key, "Record locked mid-edit; deletion queued");
                shared.pending_deletions.push(request);
                return Ok(());
            }
            self.update_status(&mut shared, SaveStatus::Saving);
        }

        let result = self.delete_remote(&request).await;
        match result {
            Ok(()) => {
                info!(stage = %request.stage, step_key = request.step_key, "Step deleted");
                {
                    let mut shared = self.shared();
                    shared.last_acked = shared
                        .last_acked
                        .as_ref()
                        .map(|acked| acked.without_step(request.stage, request.step_key));
                    shared.standards_pending = false;
                    self.update_status(&mut shared, SaveStatus::Saved);
                }
                self.refresh_standards().await;
                Ok(())
            }
            Err(e) => {
                self.shared().pending_deletions.push(request);
                Err(self.fail(e, "Step deletion"))
            }
        }
    }
}

/// Debounced draft writer for one worksheet
///
/// Cheap to clone; clones share state. Methods that schedule saves must be
/// called from within a Tokio runtime.
#[derive(Clone)]
pub struct DraftReconciler {
    inner: Arc<Inner>,
}

impl DraftReconciler {
    pub fn new(
        backend: Arc<dyn CalibrationBackend>,
        config: ReconcilerConfig,
        event_bus: EventBus,
    ) -> Self {
        let standards = StandardsTrigger::new(Arc::clone(&backend), event_bus.clone());
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared::default()),
                write_gate: tokio::sync::Mutex::new(()),
                backend,
                standards,
                config,
                event_bus,
            }),
        }
    }

    /// Install the backend's copy as the acknowledged baseline
    ///
    /// Never schedules a save.
    pub fn hydrate(&self, mut sheet: Worksheet) {
        let mut shared = self.inner.shared();
        shared.cancel_pending();
        sheet.state.is_locked = shared.lock.is_locked;
        let job_id = sheet.job_id();
        shared.last_acked = Some(sheet.snapshot());
        shared.sheet = Some(sheet);
        shared.pending_deletions.clear();
        shared.standards_pending = false;
        shared.busy_stages.clear();
        shared.view_state = None;
        self.inner.update_status(&mut shared, SaveStatus::Idle);
        info!(job_id = %job_id, "Worksheet hydrated");
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.shared().sheet.is_some()
    }

    /// Apply the record lock reported by the backend
    ///
    /// Returns true when the lock state changed.
    pub fn set_locked(&self, lock: &LockStatus) -> bool {
        let mut shared = self.inner.shared();
        let changed = shared.lock != *lock;
        shared.lock = lock.clone();
        if let Some(sheet) = shared.sheet.as_mut() {
            sheet.state.is_locked = lock.is_locked;
        }

        if lock.is_locked {
            if shared.cancel_pending() {
                debug!("Pending save cancelled: record locked");
            }
        } else if shared.view_state.take().is_some() {
            debug!("Viewer position dropped: record unlocked");
        }
        if !lock.is_locked && changed && shared.busy_stages.is_empty() && shared.is_dirty() {
            self.schedule_save(&mut shared);
        }
        changed
    }

    pub fn lock_status(&self) -> LockStatus {
        self.inner.shared().lock.clone()
    }

    /// Mutate the worksheet as a user edit
    ///
    /// `stage` names the stage the edit touches (for save policy and the
    /// structural-edit guard); `None` for stage-independent edits. Returns
    /// `None` when the edit was suppressed by the lock.
    pub fn edit_with<T>(
        &self,
        stage: Option<StageId>,
        f: impl FnOnce(&mut Worksheet) -> WorksheetResult<T>,
    ) -> WorksheetResult<Option<T>> {
        let mut shared = self.inner.shared();
        if shared.admit(stage)? == EditOutcome::Suppressed {
            return Ok(None);
        }

        let value = f(shared.sheet_mut()?)?;

        let policy = stage
            .map(|s| self.inner.config.policy_for(s))
            .unwrap_or_default();
        match policy {
            SavePolicy::DebouncedAutoSave => self.schedule_save(&mut shared),
            SavePolicy::Manual => trace!(stage = ?stage, "Manual save policy, no save scheduled"),
        }
        Ok(Some(value))
    }

    pub fn edit(
        &self,
        stage: Option<StageId>,
        f: impl FnOnce(&mut Worksheet) -> WorksheetResult<()>,
    ) -> WorksheetResult<EditOutcome> {
        Ok(match self.edit_with(stage, f)? {
            Some(()) => EditOutcome::Applied,
            None => EditOutcome::Suppressed,
        })
    }

    pub fn set_reading(
        &self,
        stage: StageId,
        step_key: u32,
        slot: usize,
        value: impl Into<String>,
    ) -> WorksheetResult<EditOutcome> {
        let value = value.into();
        self.edit(Some(stage), |sheet| sheet.set_reading(stage, step_key, slot, value))
    }

    pub fn clear_row(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        self.edit(Some(stage), |sheet| sheet.clear_row(stage, step_key))
    }

    /// Apply a backend result; it is only queued for saving when the record
    /// is unlocked
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut Worksheet) -> WorksheetResult<T>,
    ) -> WorksheetResult<T> {
        let mut shared = self.inner.shared();
        let value = f(shared.sheet_mut()?)?;
        if shared.lock.is_locked {
            debug!("Change applied while locked, not persisted");
        } else if shared.is_dirty() {
            self.schedule_save(&mut shared);
        }
        Ok(value)
    }

    /// Move through the workflow
    ///
    /// Unlocked, the move is persisted like any other change. Locked, it
    /// only moves the viewer's position; gates still apply against the
    /// current stage validity.
    pub fn navigate(
        &self,
        f: impl FnOnce(&mut WorkflowState) -> WorksheetResult<StageTransition>,
    ) -> WorksheetResult<StageTransition> {
        let mut shared = self.inner.shared();
        if !shared.lock.is_locked {
            let transition = f(&mut shared.sheet_mut()?.state)?;
            if shared.is_dirty() {
                self.schedule_save(&mut shared);
            }
            return Ok(transition);
        }

        let persisted = shared.sheet()?.state.clone();
        let mut view = match shared.view_state.take() {
            Some(mut view) => {
                view.stage_validity = persisted.stage_validity;
                view.status = persisted.status;
                view.is_locked = true;
                view
            }
            None => persisted,
        };
        let result = f(&mut view);
        shared.view_state = Some(view);
        if result.is_ok() {
            debug!("Viewer navigation while locked, not persisted");
        }
        result
    }

    /// Workflow state as the user sees it (viewer position while locked)
    pub fn workflow_state(&self) -> WorksheetResult<WorkflowState> {
        let shared = self.inner.shared();
        let sheet = shared.sheet()?;
        Ok(shared
            .view_state
            .clone()
            .unwrap_or_else(|| sheet.state.clone()))
    }

    /// Record a terminal job status and stop pending saves
    pub fn mark_status(&self, status: JobStatus) -> WorksheetResult<()> {
        let mut shared = self.inner.shared();
        shared.sheet_mut()?.state.close(status);
        shared.cancel_pending();
        Ok(())
    }

    pub async fn add_step(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        self.add_steps(stage, &[step_key]).await
    }

    /// Enable steps on a dynamic stage and persist them immediately
    ///
    /// The rows stay even if the write fails; the next debounce cycle
    /// retries the full draft.
    pub async fn add_steps(&self, stage: StageId, keys: &[u32]) -> WorksheetResult<EditOutcome> {
        let job_id = {
            let mut shared = self.inner.shared();
            if shared.admit(Some(stage))? == EditOutcome::Suppressed {
                return Ok(EditOutcome::Suppressed);
            }

            let sheet = shared.sheet_mut()?;
            let mut inserted = Vec::with_capacity(keys.len());
            for key in keys {
                if let Err(e) = sheet.insert_step(stage, *key) {
                    for done in &inserted {
                        if let Err(undo) = sheet.remove_step(stage, *done) {
                            warn!(stage = %stage, step_key = *done, error = %undo, "Batch rollback could not remove step");
                        }
                    }
                    return Err(e);
                }
                inserted.push(*key);
            }
            if inserted.is_empty() {
                return Ok(EditOutcome::Applied);
            }
            let job_id = sheet.job_id();

            shared
                .pending_deletions
                .retain(|r| !(r.stage == stage && keys.contains(&r.step_key)));
            shared.busy_stages.insert(stage);
            shared.cancel_pending();
            job_id
        };

        for key in keys {
            self.inner.event_bus.emit_lossy(CalibEvent::StepAdded {
                job_id,
                stage,
                step_key: *key,
                timestamp: Utc::now(),
            });
        }
        debug!(stage = %stage, steps = ?keys, "Steps added, writing draft");

        let result = self.inner.structural_add(stage).await;
        self.release_stage(stage);
        result.map(|()| EditOutcome::Applied)
    }

    /// Disable a step on a dynamic stage and delete it remotely
    ///
    /// The row stays removed even if the delete fails; the deletion is
    /// queued and retried before the next draft write.
    pub async fn remove_step(&self, stage: StageId, step_key: u32) -> WorksheetResult<EditOutcome> {
        let request = {
            let mut shared = self.inner.shared();
            if shared.admit(Some(stage))? == EditOutcome::Suppressed {
                return Ok(EditOutcome::Suppressed);
            }

            let sheet = shared.sheet_mut()?;
            sheet.remove_step(stage, step_key)?;
            let request = DeleteStepRequest {
                job_id: sheet.job_id(),
                stage,
                step_key,
            };
            shared.busy_stages.insert(stage);
            shared.cancel_pending();
            request
        };

        self.inner.event_bus.emit_lossy(CalibEvent::StepRemoved {
            job_id: request.job_id,
            stage,
            step_key,
            timestamp: Utc::now(),
        });
        debug!(stage = %stage, step_key, "Step removed, deleting remotely");

        let result = self.inner.structural_remove(request).await;
        self.release_stage(stage);
        result.map(|()| EditOutcome::Applied)
    }

    /// Write the draft now, regardless of save policy
    pub async fn save_now(&self) -> WorksheetResult<EditOutcome> {
        {
            let mut shared = self.inner.shared();
            shared.sheet()?;
            if shared.lock.is_locked {
                return Ok(EditOutcome::Suppressed);
            }
            shared.cancel_pending();
        }
        self.inner.flush(None).await
    }

    /// Explicit "recompute standards" action
    pub async fn recompute_standards(&self) -> WorksheetResult<StandardSnapshot> {
        let _gate = self.inner.write_gate.lock().await;
        let request = {
            let shared = self.inner.shared();
            let sheet = shared.sheet()?;
            if shared.lock.is_locked {
                return Err(WorksheetError::Locked(shared.lock.locked_by.clone()));
            }
            sheet.standards_request()
        };
        self.inner.standards.refresh(&request).await
    }

    /// Fetch the current standard selection for display
    pub async fn load_standards(&self) -> WorksheetResult<Option<StandardSnapshot>> {
        let job_id = self.inner.shared().sheet()?.job_id();
        self.inner.standards.load(job_id).await
    }

    pub fn standards(&self) -> &StandardsTrigger {
        &self.inner.standards
    }

    /// Read the current worksheet
    pub fn read<T>(&self, f: impl FnOnce(&Worksheet) -> T) -> WorksheetResult<T> {
        let shared = self.inner.shared();
        Ok(f(shared.sheet()?))
    }

    /// Current (possibly unsaved) snapshot
    pub fn snapshot(&self) -> WorksheetResult<DraftSnapshot> {
        self.read(|sheet| sheet.snapshot())
    }

    /// Last snapshot the backend acknowledged
    pub fn last_acknowledged(&self) -> Option<DraftSnapshot> {
        self.inner.shared().last_acked.clone()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.inner.shared().status.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.shared().is_dirty()
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.shared().pending.is_some()
    }

    pub fn pending_deletions(&self) -> Vec<DeleteStepRequest> {
        self.inner.shared().pending_deletions.clone()
    }

    /// Cancel any pending debounced save
    pub fn cancel_pending(&self) {
        self.inner.shared().cancel_pending();
    }

    fn release_stage(&self, stage: StageId) {
        let mut shared = self.inner.shared();
        shared.busy_stages.remove(&stage);
        if !shared.lock.is_locked && shared.is_dirty() {
            self.schedule_save(&mut shared);
        }
    }

    /// Restart the debounce window
    fn schedule_save(&self, shared: &mut Shared) {
        shared.cancel_pending();
        shared.next_generation += 1;
        let generation = shared.next_generation;
        let cancel = CancellationToken::new();
        shared.pending = Some(PendingSave {
            generation,
            cancel: cancel.clone(),
        });

        let delay = self.inner.config.debounce;
        debug!(generation, delay_ms = delay.as_millis() as u64, "Draft save scheduled");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = inner.flush(Some(generation)).await {
                        debug!(generation, error = %e, "Debounced save failed");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_to_debounced() {
        let mut config = ReconcilerConfig::default();
        config.save_policy.insert(StageId::OutputDrive, SavePolicy::Manual);
        assert_eq!(config.policy_for(StageId::Repeatability), SavePolicy::DebouncedAutoSave);
        assert_eq!(config.policy_for(StageId::OutputDrive), SavePolicy::Manual);
    }

    #[test]
    fn test_outcome_is_applied() {
        assert!(EditOutcome::Applied.is_applied());
        assert!(!EditOutcome::Suppressed.is_applied());
    }
}
