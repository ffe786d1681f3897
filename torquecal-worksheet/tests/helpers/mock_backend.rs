//! In-memory CalibrationBackend for tests
//!
//! Records every call, keeps just enough state to answer consistently, and
//! lets a test inject failures per operation.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use torquecal_common::events::EnvironmentPhase;
use torquecal_worksheet::error::BackendError;
use torquecal_worksheet::models::{
    AutoSelectResponse, DeleteStepRequest, DraftSnapshot, EnvironmentBounds, EnvironmentRecord,
    EnvironmentSubmission, JobData, LockStatus, ReferenceStandard, SelectionMode,
    StandardSnapshot, StandardsRequest,
};
use torquecal_worksheet::services::backend::{BackendResult, CalibrationBackend};
use uuid::Uuid;

/// Backend operation, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchJob,
    SaveDraft,
    DeleteStep,
    AutoSelect,
    FetchStandards,
    FetchEnvironment,
    SaveEnvironment,
    FetchLock,
    Complete,
    Uncertainty,
    Terminate,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchJob(Uuid),
    SaveDraft(DraftSnapshot),
    DeleteStep(DeleteStepRequest),
    AutoSelect(SelectionMode),
    FetchStandards(Uuid),
    FetchEnvironment(EnvironmentPhase),
    SaveEnvironment(EnvironmentSubmission),
    FetchLock(Uuid),
    Complete(Uuid),
    Uncertainty(Uuid),
    Terminate(String),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::FetchJob(_) => Op::FetchJob,
            Call::SaveDraft(_) => Op::SaveDraft,
            Call::DeleteStep(_) => Op::DeleteStep,
            Call::AutoSelect(_) => Op::AutoSelect,
            Call::FetchStandards(_) => Op::FetchStandards,
            Call::FetchEnvironment(_) => Op::FetchEnvironment,
            Call::SaveEnvironment(_) => Op::SaveEnvironment,
            Call::FetchLock(_) => Op::FetchLock,
            Call::Complete(_) => Op::Complete,
            Call::Uncertainty(_) => Op::Uncertainty,
            Call::Terminate(_) => Op::Terminate,
        }
    }
}

struct MockState {
    job: JobData,
    calls: Vec<Call>,
    environment: HashMap<EnvironmentPhase, EnvironmentRecord>,
    lock: LockStatus,
    selectable: Vec<ReferenceStandard>,
    selected: Option<StandardSnapshot>,
    status_override: Option<String>,
    failures: HashMap<Op, VecDeque<BackendError>>,
}

/// Scriptable backend double
pub struct MockBackend {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockBackend {
    pub fn new(job: JobData) -> Self {
        Self {
            state: Mutex::new(MockState {
                job,
                calls: Vec::new(),
                environment: HashMap::new(),
                lock: LockStatus::unlocked(),
                selectable: Vec::new(),
                selected: None,
                status_override: None,
                failures: HashMap::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.state.lock().unwrap().job.job_id
    }

    /// Every write sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Standards the backend will pick on the next auto-select
    pub fn with_selectable(self, standards: Vec<ReferenceStandard>) -> Self {
        self.state.lock().unwrap().selectable = standards;
        self
    }

    /// Standards already selected before the session opens
    pub fn with_selected(self, snapshot: StandardSnapshot) -> Self {
        self.state.lock().unwrap().selected = Some(snapshot);
        self
    }

    pub fn with_environment(self, record: EnvironmentRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .environment
            .insert(record.phase, record);
        self
    }

    pub fn with_lock(self, lock: LockStatus) -> Self {
        self.set_lock(lock);
        self
    }

    pub fn set_lock(&self, lock: LockStatus) {
        self.state.lock().unwrap().lock = lock;
    }

    pub fn set_selectable(&self, standards: Vec<ReferenceStandard>) {
        self.state.lock().unwrap().selectable = standards;
    }

    /// Force the auto-select status discriminator
    pub fn set_auto_select_status(&self, status: &str) {
        self.state.lock().unwrap().status_override = Some(status.to_string());
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Op, error: BackendError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    /// Operations in call order, ignoring reads
    pub fn write_ops(&self) -> Vec<Op> {
        self.calls()
            .iter()
            .map(Call::op)
            .filter(|op| {
                !matches!(
                    op,
                    Op::FetchJob | Op::FetchEnvironment | Op::FetchLock | Op::FetchStandards
                )
            })
            .collect()
    }

    pub fn drafts(&self) -> Vec<DraftSnapshot> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SaveDraft(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn last_draft(&self) -> Option<DraftSnapshot> {
        self.drafts().pop()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        match state.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl CalibrationBackend for MockBackend {
    async fn fetch_job(&self, job_id: Uuid) -> BackendResult<JobData> {
        self.record(Call::FetchJob(job_id))?;
        let state = self.state.lock().unwrap();
        if state.job.job_id != job_id {
            return Err(BackendError::NotFound(format!("job {}", job_id)));
        }
        Ok(state.job.clone())
    }

    async fn save_draft(&self, draft: &DraftSnapshot) -> BackendResult<()> {
        self.simulate_latency().await;
        self.record(Call::SaveDraft(draft.clone()))
    }

    async fn delete_step(&self, request: &DeleteStepRequest) -> BackendResult<()> {
        self.simulate_latency().await;
        self.record(Call::DeleteStep(request.clone()))
    }

    async fn auto_select_standards(
        &self,
        mode: SelectionMode,
        request: &StandardsRequest,
    ) -> BackendResult<AutoSelectResponse> {
        self.simulate_latency().await;
        self.record(Call::AutoSelect(mode))?;
        let mut state = self.state.lock().unwrap();
        let status = state.status_override.clone().unwrap_or_else(|| {
            match state.selected {
                Some(_) => "recomputed".to_string(),
                None => "success".to_string(),
            }
        });
        state.selected = Some(StandardSnapshot {
            job_id: request.job_id,
            standards: state.selectable.clone(),
            selected_at: Some(chrono::Utc::now()),
        });
        Ok(AutoSelectResponse {
            status,
            message: None,
        })
    }

    async fn fetch_standards(&self, job_id: Uuid) -> BackendResult<StandardSnapshot> {
        self.record(Call::FetchStandards(job_id))?;
        self.state
            .lock()
            .unwrap()
            .selected
            .clone()
            .ok_or_else(|| BackendError::NotFound(format!("standards for {}", job_id)))
    }

    async fn fetch_environment(
        &self,
        _job_id: Uuid,
        phase: EnvironmentPhase,
    ) -> BackendResult<Option<EnvironmentRecord>> {
        self.record(Call::FetchEnvironment(phase))?;
        Ok(self.state.lock().unwrap().environment.get(&phase).cloned())
    }

    async fn save_environment(
        &self,
        submission: &EnvironmentSubmission,
    ) -> BackendResult<EnvironmentRecord> {
        self.simulate_latency().await;
        self.record(Call::SaveEnvironment(submission.clone()))?;
        let record = EnvironmentRecord {
            phase: submission.phase,
            reading: submission.reading,
            validation: EnvironmentBounds::default().validate(&submission.reading),
        };
        self.state
            .lock()
            .unwrap()
            .environment
            .insert(submission.phase, record.clone());
        Ok(record)
    }

    async fn fetch_lock(&self, job_id: Uuid) -> BackendResult<LockStatus> {
        self.record(Call::FetchLock(job_id))?;
        Ok(self.state.lock().unwrap().lock.clone())
    }

    async fn complete_job(&self, job_id: Uuid) -> BackendResult<()> {
        self.simulate_latency().await;
        self.record(Call::Complete(job_id))
    }

    async fn calculate_uncertainty(&self, job_id: Uuid) -> BackendResult<()> {
        self.simulate_latency().await;
        self.record(Call::Uncertainty(job_id))
    }

    async fn terminate_job(&self, _job_id: Uuid, reason: &str) -> BackendResult<()> {
        self.simulate_latency().await;
        self.record(Call::Terminate(reason.to_string()))
    }
}
