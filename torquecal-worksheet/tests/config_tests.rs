//! Configuration resolution tests
//!
//! Backend URL priority (ENV → TOML) and validation of the worksheet section.
//!
//! Note: Tests that touch TORQUECAL_BACKEND_URL are marked #[serial] so they
//! never race on the process environment.

mod helpers;

use helpers::capture_logs;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use torquecal_common::config::{load_toml_config, BackendConfig, TomlConfig};
use torquecal_common::events::{SavePolicy, StageId};
use torquecal_worksheet::config::{resolve_backend_url, BACKEND_URL_ENV_VAR};
use torquecal_worksheet::services::HttpBackend;
use torquecal_worksheet::WorksheetConfig;
use tracing::Level;

fn toml_with_url(url: Option<&str>) -> TomlConfig {
    TomlConfig {
        backend: BackendConfig {
            base_url: url.map(str::to_string),
            ..BackendConfig::default()
        },
        ..TomlConfig::default()
    }
}

// ============================================================================
// Backend URL resolution
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_toml() {
    std::env::set_var(BACKEND_URL_ENV_VAR, "http://env-host:9000/api/");
    let (logs, _guard) = capture_logs();

    let url = resolve_backend_url(&toml_with_url(Some("http://toml-host/api"))).unwrap();

    assert_eq!(url, "http://env-host:9000/api");
    assert!(logs.contains_at(Level::WARN, "Using environment"));

    // Cleanup
    std::env::remove_var(BACKEND_URL_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_fallback_when_env_missing() {
    std::env::remove_var(BACKEND_URL_ENV_VAR);

    let url = resolve_backend_url(&toml_with_url(Some("https://lab.example.com/cal/"))).unwrap();

    assert_eq!(url, "https://lab.example.com/cal");
}

#[test]
#[serial]
fn test_invalid_env_value_is_ignored() {
    std::env::set_var(BACKEND_URL_ENV_VAR, "not-a-url");

    let url = resolve_backend_url(&toml_with_url(Some("http://toml-host"))).unwrap();

    assert_eq!(url, "http://toml-host");
    std::env::remove_var(BACKEND_URL_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_url_is_config_error() {
    std::env::remove_var(BACKEND_URL_ENV_VAR);

    let err = resolve_backend_url(&toml_with_url(None)).unwrap_err();

    assert!(matches!(err, torquecal_common::Error::Config(ref msg) if msg.contains(BACKEND_URL_ENV_VAR)));
}

#[test]
#[serial]
fn test_http_backend_from_config() {
    std::env::remove_var(BACKEND_URL_ENV_VAR);
    let mut config = toml_with_url(Some("http://localhost:8080/api/"));
    config.backend.timeout_secs = 3;

    let backend = HttpBackend::from_config(&config).unwrap();

    assert_eq!(backend.base_url(), "http://localhost:8080/api");
}

// ============================================================================
// Worksheet settings
// ============================================================================

#[test]
fn test_worksheet_section_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[backend]
base_url = "http://localhost:8080"

[worksheet]
debounce_ms = 400
tolerance_percent = 6.0
default_steps = [10, 50, 90]
lock_poll_secs = 5

[worksheet.save_policy]
B = "manual"
"#
    )
    .unwrap();

    let toml_config = load_toml_config(file.path()).unwrap();
    let config = WorksheetConfig::from_toml(&toml_config).unwrap();

    assert_eq!(config.debounce, Duration::from_millis(400));
    assert_eq!(config.tolerance_percent, 6.0);
    assert_eq!(config.default_steps, vec![10, 50, 90]);
    assert_eq!(config.lock_poll_interval, Duration::from_secs(5));
    assert_eq!(config.save_policy_for(StageId::Reproducibility), SavePolicy::Manual);
    assert_eq!(
        config.save_policy_for(StageId::Repeatability),
        SavePolicy::DebouncedAutoSave
    );

    let reconciler = config.reconciler_config();
    assert_eq!(reconciler.debounce, Duration::from_millis(400));
    assert_eq!(reconciler.policy_for(StageId::Reproducibility), SavePolicy::Manual);
}

#[test]
fn test_invalid_worksheet_settings_rejected() {
    let cases = [
        "[worksheet]\ntolerance_percent = -1.0\n",
        "[worksheet]\nhumidity_min_pct = 60.0\nhumidity_max_pct = 40.0\n",
        "[worksheet]\nhumidity_max_pct = 120.0\n",
        "[worksheet]\ndefault_steps = [20, 20]\n",
        "[worksheet]\nlock_poll_secs = 0\n",
    ];
    for case in cases {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(case.as_bytes()).unwrap();
        let toml_config = load_toml_config(file.path()).unwrap();
        assert!(
            WorksheetConfig::from_toml(&toml_config).is_err(),
            "accepted invalid settings: {}",
            case
        );
    }
}

#[test]
fn test_policy_for_non_measurement_stage_warns() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[worksheet.save_policy]\nPRE = \"manual\"\n")
        .unwrap();
    let toml_config = load_toml_config(file.path()).unwrap();
    let (logs, _guard) = capture_logs();

    assert!(WorksheetConfig::from_toml(&toml_config).is_ok());
    assert!(logs.contains_at(Level::WARN, "without measurement rows"));
}
