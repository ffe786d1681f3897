//! Error types for torquecal-worksheet
//!
//! Two layers: [`BackendError`] describes what went wrong on the wire,
//! [`WorksheetError`] is what every worksheet operation returns.

use crate::models::JobStatus;
use thiserror::Error;
use torquecal_common::events::StageId;

/// Result alias for worksheet operations
pub type WorksheetResult<T> = Result<T, WorksheetError>;

/// Backend client errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record locked: {0}")]
    Locked(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Auto-select returned a status discriminator the client does not know
    #[error("Unexpected auto-select status: {0}")]
    UnexpectedStatus(String),
}

/// Worksheet operation errors
#[derive(Debug, Error)]
pub enum WorksheetError {
    /// Mutation attempted before the first backend snapshot was installed
    #[error("Worksheet not hydrated")]
    NotHydrated,

    /// Record lock held by another user
    #[error("Worksheet is locked{}", .0.as_deref().map(|u| format!(" by {}", u)).unwrap_or_default())]
    Locked(Option<String>),

    #[error("Stage {stage}: step {step_key} not found")]
    StepNotFound { stage: StageId, step_key: u32 },

    #[error("Stage {stage}: step {step_key} already exists")]
    DuplicateStep { stage: StageId, step_key: u32 },

    #[error("Stage {stage}: invalid step key {step_key}")]
    InvalidStepKey { stage: StageId, step_key: u32 },

    #[error("Reading slot {slot} out of range (row has {slots} slots)")]
    SlotOutOfRange { slot: usize, slots: usize },

    #[error("Stage {0} has a fixed row set")]
    NotDynamicStage(StageId),

    #[error("Stage {0} holds no measurement rows")]
    NotMeasurementStage(StageId),

    /// Add/remove round trip still running for the stage
    #[error("Structural edit in flight for stage {0}")]
    StructuralEditInFlight(StageId),

    /// Forward navigation blocked by an environment gate
    #[error("Cannot leave stage {stage}: {reason}")]
    GateBlocked { stage: StageId, reason: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Job is {0:?}")]
    JobClosed(JobStatus),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Common error: {0}")]
    Common(#[from] torquecal_common::Error),
}
