//! Data models for the calibration worksheet

pub mod draft;
pub mod environment;
pub mod job;
pub mod measurement_row;
pub mod reference_table;
pub mod stage_record;
pub mod standards;
pub mod workflow_state;
pub mod worksheet;

pub use draft::DraftSnapshot;
pub use environment::{
    EnvironmentBounds, EnvironmentReading, EnvironmentRecord, EnvironmentSubmission,
    EnvironmentValidation,
};
pub use job::{DeleteStepRequest, Equipment, JobData, LockStatus, PersistedStep};
pub use measurement_row::MeasurementRow;
pub use reference_table::{ReferencePoint, ReferenceTable};
pub use stage_record::{RowSet, StageLayout, StageMetric, StageRecord};
pub use standards::{
    AutoSelectResponse, AutoSelectStatus, ReferenceStandard, SelectionMode, StandardSnapshot,
    StandardsRequest,
};
pub use workflow_state::{JobStatus, StageTransition, WorkflowState};
pub use worksheet::{Worksheet, MAX_STEP_PERCENT};
