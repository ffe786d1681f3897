//! Test helper utilities
//!
//! Shared utilities for testing torquecal-worksheet

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;
pub mod mock_backend;

pub use fixtures::*;
pub use log_capture::{capture_logs, LogCapture};
pub use mock_backend::{Call, MockBackend, Op};
