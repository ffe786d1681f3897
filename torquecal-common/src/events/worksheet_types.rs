//! Worksheet-related type definitions
//!
//! Supporting types shared by the event bus, the configuration file and the
//! worksheet crate: stage identifiers, save policies and the save status
//! machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Calibration workflow stage
///
/// Declaration order is workflow order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageId {
    /// Environment check before measuring
    #[serde(rename = "PRE")]
    PreCheck,
    /// Stage A: repeatability at selected percentage steps
    #[serde(rename = "A")]
    Repeatability,
    /// Stage B: reproducibility over four sequences
    #[serde(rename = "B")]
    Reproducibility,
    /// Stage C: output drive at four angular positions
    #[serde(rename = "C")]
    OutputDrive,
    /// Stage D: drive interface
    #[serde(rename = "D")]
    DriveInterface,
    /// Stage E: loading point at two lever positions
    #[serde(rename = "E")]
    LoadingPoint,
    /// Environment check after measuring
    #[serde(rename = "POST")]
    PostCheck,
}

impl StageId {
    /// All stages in workflow order
    pub const ALL: [StageId; 7] = [
        StageId::PreCheck,
        StageId::Repeatability,
        StageId::Reproducibility,
        StageId::OutputDrive,
        StageId::DriveInterface,
        StageId::LoadingPoint,
        StageId::PostCheck,
    ];

    /// Stages that hold measurement rows
    pub const MEASUREMENT: [StageId; 5] = [
        StageId::Repeatability,
        StageId::Reproducibility,
        StageId::OutputDrive,
        StageId::DriveInterface,
        StageId::LoadingPoint,
    ];

    /// Short wire code ("PRE", "A" .. "E", "POST")
    pub fn code(&self) -> &'static str {
        match self {
            StageId::PreCheck => "PRE",
            StageId::Repeatability => "A",
            StageId::Reproducibility => "B",
            StageId::OutputDrive => "C",
            StageId::DriveInterface => "D",
            StageId::LoadingPoint => "E",
            StageId::PostCheck => "POST",
        }
    }

    /// Position in the workflow (0-based)
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<StageId> {
        StageId::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<StageId> {
        self.index().checked_sub(1).map(|i| StageId::ALL[i])
    }

    pub fn is_measurement(&self) -> bool {
        !matches!(self, StageId::PreCheck | StageId::PostCheck)
    }

    /// Environment phase checked by this stage, if any
    pub fn environment_phase(&self) -> Option<EnvironmentPhase> {
        match self {
            StageId::PreCheck => Some(EnvironmentPhase::Pre),
            StageId::PostCheck => Some(EnvironmentPhase::Post),
            _ => None,
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .iter()
            .find(|stage| stage.code().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown stage code: {}", s))
    }
}

/// Environment check phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvironmentPhase {
    Pre,
    Post,
}

impl EnvironmentPhase {
    pub fn code(&self) -> &'static str {
        match self {
            EnvironmentPhase::Pre => "PRE",
            EnvironmentPhase::Post => "POST",
        }
    }

    /// Stage that owns this environment check
    pub fn stage(&self) -> StageId {
        match self {
            EnvironmentPhase::Pre => StageId::PreCheck,
            EnvironmentPhase::Post => StageId::PostCheck,
        }
    }
}

impl std::fmt::Display for EnvironmentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// How edits to a stage reach the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavePolicy {
    /// Only an explicit save writes the draft
    Manual,
    /// Trailing-edge debounced draft write after every edit
    #[default]
    DebouncedAutoSave,
}

/// Draft save status shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing written since hydration
    #[default]
    Idle,
    /// A write is in flight
    Saving,
    /// Last write acknowledged
    Saved,
    /// Last write failed; the next cycle retries
    Error { message: String },
}

impl SaveStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SaveStatus::Error { .. })
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "idle"),
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Saved => write!(f, "saved"),
            SaveStatus::Error { message } => write!(f, "error: {}", message),
        }
    }
}
