//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MeridianConfig;
use crate::config::secret_string;
use crate::domain::errors::MeridianError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into MeridianConfig
/// 4. Applies environment variable overrides (MERIDIAN_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use meridian::config::loader::load_config;
///
/// let config = load_config("meridian.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MeridianConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MeridianError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MeridianError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: MeridianConfig = toml::from_str(&contents)
        .map_err(|e| MeridianError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        MeridianError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. A referenced but unset variable is an
/// error listing every missing name.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MeridianError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the MERIDIAN_* prefix
///
/// Environment variables follow the pattern: MERIDIAN_<SECTION>_<KEY>
/// For example: MERIDIAN_PM_BASE_URL, MERIDIAN_SYNC_INTERVAL_SECONDS
fn apply_env_overrides(config: &mut MeridianConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("MERIDIAN_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // PM overrides
    if let Ok(val) = std::env::var("MERIDIAN_PM_BASE_URL") {
        config.pm.base_url = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_TOKEN_URL") {
        config.pm.token_url = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_CLIENT_ID") {
        config.pm.client_id = Some(val);
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_CLIENT_SECRET") {
        config.pm.client_secret = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_ORGANIZATION_ID") {
        config.pm.organization_id = Some(val);
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_PRACTITIONER_ID") {
        config.pm.practitioner_id = Some(val);
    }
    if let Ok(val) = std::env::var("MERIDIAN_PM_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.pm.timeout_seconds = timeout;
        }
    }

    // Database overrides
    if let Ok(val) = std::env::var("MERIDIAN_DATABASE_CONNECTION_STRING") {
        config.database.connection_string = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_DATABASE_MAX_CONNECTIONS") {
        if let Ok(size) = val.parse() {
            config.database.max_connections = size;
        }
    }

    // Sync overrides
    if let Ok(val) = std::env::var("MERIDIAN_SYNC_INTERVAL_SECONDS") {
        if let Ok(interval) = val.parse() {
            config.sync.interval_seconds = interval;
        }
    }
    if let Ok(val) = std::env::var("MERIDIAN_SYNC_SCHEDULED") {
        config.sync.scheduled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("MERIDIAN_SYNC_WINDOW_PAST_DAYS") {
        if let Ok(days) = val.parse() {
            config.sync.window_past_days = days;
        }
    }
    if let Ok(val) = std::env::var("MERIDIAN_SYNC_WINDOW_FUTURE_DAYS") {
        if let Ok(days) = val.parse() {
            config.sync.window_future_days = days;
        }
    }

    // Server overrides
    if let Ok(val) = std::env::var("MERIDIAN_SERVER_BIND_ADDR") {
        config.server.bind_addr = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_SERVER_WEBHOOK_SECRET") {
        config.server.webhook_secret = Some(secret_string(val));
    }

    // Logging overrides
    if let Ok(val) = std::env::var("MERIDIAN_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("MERIDIAN_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
