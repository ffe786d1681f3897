//! Configuration loading and config file resolution
//!
//! The TOML file carries bootstrap concerns only: where the backend lives,
//! how to log, and the worksheet tuning knobs. Every section is optional and
//! falls back to built-in defaults, so a missing or partial file never stops
//! a session from opening.
//!
//! Config file resolution priority:
//! 1. Explicit path (caller-supplied, e.g. a command-line argument)
//! 2. `TORQUECAL_CONFIG` environment variable
//! 3. `<OS config dir>/torquecal/config.toml` if it exists

use crate::events::{SavePolicy, StageId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TORQUECAL_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// REST backend location
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Worksheet behaviour
    #[serde(default)]
    pub worksheet: WorksheetSettings,
}

/// REST backend location and HTTP behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://lab.example.com/api/calibration`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error,
    /// or a full `EnvFilter` expression)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Worksheet tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetSettings {
    /// Inactivity window before a draft save fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Pass/fail limit on |deviation %|
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: f64,

    /// Lower bound of the permitted lab temperature (°C)
    #[serde(default = "default_temperature_min_c")]
    pub temperature_min_c: f64,

    /// Upper bound of the permitted lab temperature (°C)
    #[serde(default = "default_temperature_max_c")]
    pub temperature_max_c: f64,

    /// Lower bound of the permitted relative humidity (%RH)
    #[serde(default)]
    pub humidity_min_pct: f64,

    /// Upper bound of the permitted relative humidity (%RH)
    #[serde(default = "default_humidity_max_pct")]
    pub humidity_max_pct: f64,

    /// Repeatability steps (percent of max torque) seeded for a new job
    #[serde(default = "default_steps")]
    pub default_steps: Vec<u32>,

    /// Per-stage save policy; stages not listed use debounced auto-save
    #[serde(default)]
    pub save_policy: BTreeMap<StageId, SavePolicy>,

    /// How often the record lock is polled
    #[serde(default = "default_lock_poll_secs")]
    pub lock_poll_secs: u64,
}

impl Default for WorksheetSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            tolerance_percent: default_tolerance_percent(),
            temperature_min_c: default_temperature_min_c(),
            temperature_max_c: default_temperature_max_c(),
            humidity_min_pct: 0.0,
            humidity_max_pct: default_humidity_max_pct(),
            default_steps: default_steps(),
            save_policy: BTreeMap::new(),
            lock_poll_secs: default_lock_poll_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_tolerance_percent() -> f64 {
    4.0
}

fn default_temperature_min_c() -> f64 {
    18.0
}

fn default_temperature_max_c() -> f64 {
    28.0
}

fn default_humidity_max_pct() -> f64 {
    90.0
}

fn default_steps() -> Vec<u32> {
    vec![20, 60, 100]
}

fn default_lock_poll_secs() -> u64 {
    15
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no explicit path is given and the per-user default
/// file does not exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: caller-supplied path
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config dir
    default_config_path().filter(|p| p.exists())
}

/// `<OS config dir>/torquecal/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("torquecal").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// A missing or unreadable file yields built-in defaults and a warning.
pub fn load_or_default(explicit: Option<&Path>) -> TomlConfig {
    let Some(path) = resolve_config_path(explicit) else {
        info!("No config file found, using built-in defaults");
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Configuration loaded from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using built-in defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.worksheet.debounce_ms, 1000);
        assert_eq!(config.worksheet.default_steps, vec![20, 60, 100]);
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [worksheet]
            debounce_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.worksheet.debounce_ms, 250);
        assert_eq!(config.worksheet.tolerance_percent, 4.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }
}
