//! # torquecal Common Library
//!
//! Shared code for the torquecal crates including:
//! - Error type used by configuration and logging
//! - TOML configuration loading
//! - Logging initialisation
//! - Event types (CalibEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
