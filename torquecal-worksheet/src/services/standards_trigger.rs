//! Reference standard auto-selection trigger
//!
//! The backend chooses the reference instruments that cover the measurement
//! range implied by the stage-A step set. This module only decides *when* to
//! ask and keeps the displayed snapshot in step with the backend's answer.
//!
//! Refresh sequence:
//! 1. `POST` (first selection in this session) or `PUT` (recompute) to the
//!    auto-select endpoint
//! 2. branch on the returned status (`success` / `recomputed`)
//! 3. re-fetch the standards and overwrite the displayed snapshot
//!
//! Failure never undoes a step edit; the displayed snapshot is kept and
//! marked stale.

use crate::error::BackendError;
use crate::models::{AutoSelectStatus, SelectionMode, StandardSnapshot, StandardsRequest};
use crate::services::CalibrationBackend;
use crate::WorksheetResult;
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use torquecal_common::events::{CalibEvent, EventBus};
use uuid::Uuid;

/// Freshness of the displayed standard snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StandardsStatus {
    /// Nothing fetched yet
    #[default]
    Unknown,
    /// Auto-select round trip in flight
    Refreshing,
    /// Matches the backend as of the last refresh
    Fresh,
    /// Last refresh failed; the displayed snapshot may be outdated
    Stale(String),
}

impl fmt::Display for StandardsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardsStatus::Unknown => write!(f, "unknown"),
            StandardsStatus::Refreshing => write!(f, "refreshing"),
            StandardsStatus::Fresh => write!(f, "fresh"),
            StandardsStatus::Stale(reason) => write!(f, "stale: {}", reason),
        }
    }
}

#[derive(Default)]
struct Displayed {
    snapshot: Option<StandardSnapshot>,
    status: StandardsStatus,
}

/// Owns the displayed standard snapshot for one job
///
/// Callers serialise refreshes (the draft reconciler runs them under its
/// write gate); the internal mutex only protects reads from other tasks.
pub struct StandardsTrigger {
    backend: Arc<dyn CalibrationBackend>,
    event_bus: EventBus,
    displayed: Mutex<Displayed>,
}

impl StandardsTrigger {
    pub fn new(backend: Arc<dyn CalibrationBackend>, event_bus: EventBus) -> Self {
        Self {
            backend,
            event_bus,
            displayed: Mutex::new(Displayed::default()),
        }
    }

    pub fn snapshot(&self) -> Option<StandardSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn status(&self) -> StandardsStatus {
        self.lock().status.clone()
    }

    /// Verb for the next auto-select call
    ///
    /// A snapshot counts as displayed once it lists at least one standard.
    pub fn selection_mode(&self) -> SelectionMode {
        let displayed = self.lock();
        match &displayed.snapshot {
            Some(snapshot) if !snapshot.standards.is_empty() => SelectionMode::Recompute,
            _ => SelectionMode::Create,
        }
    }

    /// Fetch and display the current selection without asking for a new one
    ///
    /// A job without a selection yet (`404`) yields `Ok(None)`.
    pub async fn load(&self, job_id: Uuid) -> WorksheetResult<Option<StandardSnapshot>> {
        match self.backend.fetch_standards(job_id).await {
            Ok(snapshot) => {
                tracing::debug!(
                    job_id = %job_id,
                    standards = snapshot.standards.len(),
                    "Loaded standard snapshot"
                );
                self.install(snapshot.clone());
                Ok(Some(snapshot))
            }
            Err(BackendError::NotFound(_)) => {
                tracing::debug!(job_id = %job_id, "No standards selected yet");
                Ok(None)
            }
            Err(e) => {
                self.mark_stale(job_id, &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Ask the backend to (re)select standards and display the result
    pub async fn refresh(&self, request: &StandardsRequest) -> WorksheetResult<StandardSnapshot> {
        let mode = self.selection_mode();
        self.lock().status = StandardsStatus::Refreshing;

        match self.run_refresh(mode, request).await {
            Ok((status, snapshot)) => {
                let recomputed = status == AutoSelectStatus::Recomputed;
                tracing::info!(
                    job_id = %request.job_id,
                    recomputed,
                    standards = snapshot.standards.len(),
                    "Reference standards refreshed"
                );
                self.install(snapshot.clone());
                self.event_bus.emit_lossy(CalibEvent::StandardsRefreshed {
                    job_id: request.job_id,
                    recomputed,
                    standard_count: snapshot.standards.len(),
                    timestamp: Utc::now(),
                });
                Ok(snapshot)
            }
            Err(e) => {
                self.mark_stale(request.job_id, &e.to_string());
                Err(e.into())
            }
        }
    }

    async fn run_refresh(
        &self,
        mode: SelectionMode,
        request: &StandardsRequest,
    ) -> Result<(AutoSelectStatus, StandardSnapshot), BackendError> {
        let response = self.backend.auto_select_standards(mode, request).await?;
        let status = AutoSelectStatus::from_wire(&response.status)
            .ok_or_else(|| BackendError::UnexpectedStatus(response.status.clone()))?;
        if let Some(message) = &response.message {
            tracing::debug!(job_id = %request.job_id, status = ?status, message = %message, "Auto-select response");
        }

        let snapshot = self.backend.fetch_standards(request.job_id).await?;
        Ok((status, snapshot))
    }

    fn install(&self, snapshot: StandardSnapshot) {
        let mut displayed = self.lock();
        displayed.snapshot = Some(snapshot);
        displayed.status = StandardsStatus::Fresh;
    }

    fn mark_stale(&self, job_id: Uuid, reason: &str) {
        tracing::warn!(job_id = %job_id, error = %reason, "Standards refresh failed, keeping displayed snapshot");
        self.lock().status = StandardsStatus::Stale(reason.to_string());
        self.event_bus.emit_lossy(CalibEvent::StandardsRefreshFailed {
            job_id,
            message: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Displayed> {
        self.displayed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
