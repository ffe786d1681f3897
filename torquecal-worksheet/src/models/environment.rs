//! PRE/POST environment checks
//!
//! The backend's validation block is authoritative and is what gates the
//! workflow. Local validation against the configured bounds only provides
//! immediate feedback while the backend round trip is pending.

use serde::{Deserialize, Serialize};
use torquecal_common::events::EnvironmentPhase;

/// Lab conditions at the time of the check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// Validation block returned with every environment record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Stored environment check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub phase: EnvironmentPhase,
    pub reading: EnvironmentReading,
    pub validation: EnvironmentValidation,
}

/// Body of the environment `POST`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSubmission {
    pub job_id: uuid::Uuid,
    pub phase: EnvironmentPhase,
    pub reading: EnvironmentReading,
}

/// Permitted lab conditions (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentBounds {
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub humidity_min_pct: f64,
    pub humidity_max_pct: f64,
}

impl Default for EnvironmentBounds {
    fn default() -> Self {
        Self {
            temperature_min_c: 18.0,
            temperature_max_c: 28.0,
            humidity_min_pct: 0.0,
            humidity_max_pct: 90.0,
        }
    }
}

impl EnvironmentBounds {
    /// Check a reading against the bounds
    pub fn validate(&self, reading: &EnvironmentReading) -> EnvironmentValidation {
        let mut warnings = Vec::new();

        let t = reading.temperature_c;
        if !t.is_finite() || t < self.temperature_min_c || t > self.temperature_max_c {
            warnings.push(format!(
                "Temperature {:.1} °C outside {:.1}–{:.1} °C",
                t, self.temperature_min_c, self.temperature_max_c
            ));
        }

        let h = reading.humidity_pct;
        if !h.is_finite() || h < self.humidity_min_pct || h > self.humidity_max_pct {
            warnings.push(format!(
                "Humidity {:.1} %RH outside {:.1}–{:.1} %RH",
                h, self.humidity_min_pct, self.humidity_max_pct
            ));
        }

        EnvironmentValidation {
            is_valid: warnings.is_empty(),
            warnings,
        }
    }
}
