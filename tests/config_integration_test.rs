//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with
//! --test-threads=1 to avoid interference between tests.

use meridian::config::load_config;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("MERIDIAN_APPLICATION_LOG_LEVEL");
    std::env::remove_var("MERIDIAN_PM_BASE_URL");
    std::env::remove_var("MERIDIAN_PM_CLIENT_ID");
    std::env::remove_var("MERIDIAN_PM_CLIENT_SECRET");
    std::env::remove_var("MERIDIAN_SYNC_INTERVAL_SECONDS");
    std::env::remove_var("TEST_PM_CLIENT_SECRET");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

const COMPLETE_CONFIG: &str = r#"
[application]
log_level = "debug"

[pm]
base_url = "https://api.pm.example.com/fhir"
token_url = "https://api.pm.example.com/oauth/token"
client_id = "meridian"
client_secret = "super-secret"
organization_id = "ORG-1"
practitioner_id = "PR-1"
timeout_seconds = 20

[pm.retry]
max_retries = 5
initial_delay_ms = 100
max_delay_ms = 2000
backoff_multiplier = 1.5

[database]
connection_string = "postgresql://meridian@localhost:5432/meridian"
max_connections = 4

[sync]
interval_seconds = 600
scheduled = false
window_past_days = 14
window_future_days = 60
stale_after_seconds = 1800

[server]
bind_addr = "127.0.0.1:9000"
webhook_secret = "hook-secret"

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "hourly"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(COMPLETE_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.pm.base_url, "https://api.pm.example.com/fhir");
    assert_eq!(config.pm.practitioner_id.as_deref(), Some("PR-1"));
    assert_eq!(config.pm.retry.max_retries, 5);
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.sync.interval_seconds, 600);
    assert!(!config.sync.scheduled);
    assert_eq!(config.sync.window_past_days, 14);
    assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
    assert!(config.server.webhook_secret.is_some());
    assert!(config.logging.local_enabled);
    assert!(config.pm.require_credentials().is_ok());
}

#[test]
fn test_minimal_config_gets_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[pm]
base_url = "https://api.pm.example.com/fhir"
token_url = "https://api.pm.example.com/oauth/token"

[database]
connection_string = "postgresql://localhost/meridian"
"#,
    );
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.pm.timeout_seconds, 30);
    assert_eq!(config.sync.interval_seconds, 900);
    assert_eq!(config.sync.window_past_days, 30);
    assert_eq!(config.sync.window_future_days, 90);
    assert_eq!(config.sync.stale_after_seconds, 3600);
    assert_eq!(config.server.bind_addr, "127.0.0.1:8520");

    // Loads fine, but sync attempts would short-circuit
    assert!(config.pm.require_credentials().is_err());
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_PM_CLIENT_SECRET", "from-env");

    let file = write_config(
        r#"
[pm]
base_url = "https://api.pm.example.com/fhir"
token_url = "https://api.pm.example.com/oauth/token"
client_id = "meridian"
client_secret = "${TEST_PM_CLIENT_SECRET}"

[database]
connection_string = "postgresql://localhost/meridian"
"#,
    );
    let config = load_config(file.path()).unwrap();

    use secrecy::ExposeSecret;
    assert_eq!(
        config.pm.client_secret.as_ref().unwrap().expose_secret(),
        "from-env"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[pm]
base_url = "https://api.pm.example.com/fhir"
token_url = "https://api.pm.example.com/oauth/token"
client_secret = "${MERIDIAN_DEFINITELY_NOT_SET}"

[database]
connection_string = "postgresql://localhost/meridian"
"#,
    );
    let result = load_config(file.path());
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("MERIDIAN_DEFINITELY_NOT_SET"));
}

#[test]
fn test_env_overrides_take_precedence() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("MERIDIAN_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("MERIDIAN_SYNC_INTERVAL_SECONDS", "120");

    let file = write_config(COMPLETE_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.sync.interval_seconds, 120);

    cleanup_env_vars();
}

#[test]
fn test_invalid_bind_addr_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[pm]
base_url = "https://api.pm.example.com/fhir"
token_url = "https://api.pm.example.com/oauth/token"

[database]
connection_string = "postgresql://localhost/meridian"

[server]
bind_addr = "not-an-address"
"#,
    );
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_missing_file_rejected() {
    let result = load_config("nonexistent-meridian.toml");
    assert!(result.is_err());
}
