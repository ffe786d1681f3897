//! Services: correction math, backend access, standards and draft sync

pub mod backend;
pub mod correction;
pub mod draft_reconciler;
pub mod http_backend;
pub mod standards_trigger;

pub use backend::CalibrationBackend;
pub use correction::{correct, CorrectionResult};
pub use draft_reconciler::{DraftReconciler, EditOutcome, ReconcilerConfig};
pub use http_backend::HttpBackend;
pub use standards_trigger::{StandardsStatus, StandardsTrigger};
