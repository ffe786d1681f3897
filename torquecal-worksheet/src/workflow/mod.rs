//! Stage workflow and the per-job session facade

pub mod session;
pub mod state_machine;

pub use session::CalibrationSession;
