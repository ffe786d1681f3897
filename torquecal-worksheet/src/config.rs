//! Configuration resolution for torquecal-worksheet
//!
//! Turns the raw TOML settings into validated runtime configuration.
//!
//! Backend URL priority: ENV → TOML

use crate::models::{EnvironmentBounds, MAX_STEP_PERCENT};
use crate::services::ReconcilerConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use torquecal_common::config::{TomlConfig, WorksheetSettings};
use torquecal_common::events::{SavePolicy, StageId};
use torquecal_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable overriding the backend base URL
pub const BACKEND_URL_ENV_VAR: &str = "TORQUECAL_BACKEND_URL";

/// Validated worksheet settings
#[derive(Debug, Clone, PartialEq)]
pub struct WorksheetConfig {
    pub debounce: Duration,
    pub tolerance_percent: f64,
    pub environment_bounds: EnvironmentBounds,
    pub default_steps: Vec<u32>,
    pub save_policy: BTreeMap<StageId, SavePolicy>,
    pub lock_poll_interval: Duration,
}

impl Default for WorksheetConfig {
    fn default() -> Self {
        let settings = WorksheetSettings::default();
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            tolerance_percent: settings.tolerance_percent,
            environment_bounds: EnvironmentBounds::default(),
            default_steps: settings.default_steps,
            save_policy: settings.save_policy,
            lock_poll_interval: Duration::from_secs(settings.lock_poll_secs),
        }
    }
}

impl WorksheetConfig {
    /// Validate the `[worksheet]` section of a loaded config
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        Self::from_settings(&config.worksheet)
    }

    pub fn from_settings(settings: &WorksheetSettings) -> Result<Self> {
        if !settings.tolerance_percent.is_finite() || settings.tolerance_percent <= 0.0 {
            return Err(Error::Config(format!(
                "tolerance_percent must be positive, got {}",
                settings.tolerance_percent
            )));
        }

        if settings.temperature_min_c > settings.temperature_max_c {
            return Err(Error::Config(format!(
                "temperature_min_c ({}) exceeds temperature_max_c ({})",
                settings.temperature_min_c, settings.temperature_max_c
            )));
        }

        if settings.humidity_min_pct < 0.0
            || settings.humidity_max_pct > 100.0
            || settings.humidity_min_pct > settings.humidity_max_pct
        {
            return Err(Error::Config(format!(
                "humidity bounds {}-{} %RH are not a range within 0-100",
                settings.humidity_min_pct, settings.humidity_max_pct
            )));
        }

        let mut seen = BTreeSet::new();
        for step in &settings.default_steps {
            if *step == 0 || *step > MAX_STEP_PERCENT {
                return Err(Error::Config(format!(
                    "default step {} outside 1-{} %",
                    step, MAX_STEP_PERCENT
                )));
            }
            if !seen.insert(*step) {
                return Err(Error::Config(format!("default step {} listed twice", step)));
            }
        }

        if settings.lock_poll_secs == 0 {
            return Err(Error::Config("lock_poll_secs must be at least 1".to_string()));
        }

        for stage in settings.save_policy.keys() {
            if !stage.is_measurement() {
                warn!(stage = %stage, "Save policy set for a stage without measurement rows");
            }
        }

        Ok(Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            tolerance_percent: settings.tolerance_percent,
            environment_bounds: EnvironmentBounds {
                temperature_min_c: settings.temperature_min_c,
                temperature_max_c: settings.temperature_max_c,
                humidity_min_pct: settings.humidity_min_pct,
                humidity_max_pct: settings.humidity_max_pct,
            },
            default_steps: settings.default_steps.clone(),
            save_policy: settings.save_policy.clone(),
            lock_poll_interval: Duration::from_secs(settings.lock_poll_secs),
        })
    }

    /// Policy for edits to `stage`
    pub fn save_policy_for(&self, stage: StageId) -> SavePolicy {
        self.save_policy.get(&stage).copied().unwrap_or_default()
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            debounce: self.debounce,
            save_policy: self.save_policy.clone(),
        }
    }
}

/// Resolve the backend base URL
///
/// **Priority:** ENV → TOML
pub fn resolve_backend_url(toml_config: &TomlConfig) -> Result<String> {
    let env_url = std::env::var(BACKEND_URL_ENV_VAR)
        .ok()
        .filter(|u| is_valid_url(u));
    let toml_url = toml_config
        .backend
        .base_url
        .as_ref()
        .filter(|u| is_valid_url(u));

    if env_url.is_some() && toml_url.is_some() {
        warn!("Backend URL found in environment and TOML config. Using environment (highest priority).");
    }

    if let Some(url) = env_url {
        info!("Backend URL loaded from environment variable");
        return Ok(normalize_url(&url));
    }

    if let Some(url) = toml_url {
        info!("Backend URL loaded from TOML config");
        return Ok(normalize_url(url));
    }

    Err(Error::Config(format!(
        "Backend URL not configured. Set {} or [backend] base_url in the config file",
        BACKEND_URL_ENV_VAR
    )))
}

/// Non-blank http(s) URL
pub fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = WorksheetConfig::from_settings(&WorksheetSettings::default()).unwrap();
        assert_eq!(config, WorksheetConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(1000));
        assert_eq!(config.save_policy_for(StageId::Repeatability), SavePolicy::DebouncedAutoSave);
    }

    #[test]
    fn test_inverted_temperature_rejected() {
        let settings = WorksheetSettings {
            temperature_min_c: 30.0,
            temperature_max_c: 20.0,
            ..Default::default()
        };
        assert!(matches!(
            WorksheetConfig::from_settings(&settings),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_bad_default_steps_rejected() {
        for steps in [vec![0], vec![101], vec![20, 20]] {
            let settings = WorksheetSettings {
                default_steps: steps,
                ..Default::default()
            };
            assert!(WorksheetConfig::from_settings(&settings).is_err());
        }
    }

    #[test]
    fn test_zero_tolerance_rejected() {
        let settings = WorksheetSettings {
            tolerance_percent: 0.0,
            ..Default::default()
        };
        assert!(WorksheetConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("http://localhost:8080"));
        assert!(is_valid_url(" https://lab.example.com/api "));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("lab.example.com"));
        assert_eq!(normalize_url("http://x/api/ "), "http://x/api");
    }
}
