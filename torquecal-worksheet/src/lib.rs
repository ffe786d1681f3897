//! torquecal-worksheet library interface
//!
//! Calibration worksheet core: measurement model, correction engine, stage
//! workflow, debounced draft reconciliation and standards auto-selection.
//! [`workflow::CalibrationSession`] ties them together for one job.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::config::WorksheetConfig;
pub use crate::error::{BackendError, WorksheetError, WorksheetResult};
pub use crate::workflow::CalibrationSession;
