//! Backend service boundary
//!
//! Everything the worksheet needs from the REST backend. The backend owns
//! canonical state; the worksheet only reads it, proposes drafts and asks for
//! side effects (standards selection, completion, uncertainty).

use crate::error::BackendError;
use crate::models::{
    AutoSelectResponse, DeleteStepRequest, DraftSnapshot, EnvironmentRecord,
    EnvironmentSubmission, JobData, LockStatus, SelectionMode, StandardSnapshot,
    StandardsRequest,
};
use async_trait::async_trait;
use torquecal_common::events::EnvironmentPhase;
use uuid::Uuid;

/// Result alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Calibration backend operations
///
/// Implementations must be usable from spawned tasks, hence `Send + Sync`.
#[async_trait]
pub trait CalibrationBackend: Send + Sync {
    /// Job, equipment, reference table and persisted readings
    async fn fetch_job(&self, job_id: Uuid) -> BackendResult<JobData>;

    /// Upsert the whole draft
    async fn save_draft(&self, draft: &DraftSnapshot) -> BackendResult<()>;

    /// Remove one dynamic step from the persisted draft
    async fn delete_step(&self, request: &DeleteStepRequest) -> BackendResult<()>;

    /// Ask the backend to (re)select reference standards
    async fn auto_select_standards(
        &self,
        mode: SelectionMode,
        request: &StandardsRequest,
    ) -> BackendResult<AutoSelectResponse>;

    /// Currently selected standards
    async fn fetch_standards(&self, job_id: Uuid) -> BackendResult<StandardSnapshot>;

    /// Stored environment check; `None` when none was recorded
    async fn fetch_environment(
        &self,
        job_id: Uuid,
        phase: EnvironmentPhase,
    ) -> BackendResult<Option<EnvironmentRecord>>;

    /// Store an environment check, returning the backend-validated record
    async fn save_environment(
        &self,
        submission: &EnvironmentSubmission,
    ) -> BackendResult<EnvironmentRecord>;

    /// Record lock state
    async fn fetch_lock(&self, job_id: Uuid) -> BackendResult<LockStatus>;

    /// Mark the job completed
    async fn complete_job(&self, job_id: Uuid) -> BackendResult<()>;

    /// Trigger the uncertainty calculation for a completed job
    async fn calculate_uncertainty(&self, job_id: Uuid) -> BackendResult<()>;

    /// Mark the job terminated
    async fn terminate_job(&self, job_id: Uuid, reason: &str) -> BackendResult<()>;
}
