//! Configuration management for Meridian.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Meridian uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `MERIDIAN_*` environment variable overrides
//! - Default values for optional settings
//! - Type-safe configuration structs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use meridian::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("meridian.toml")?;
//!
//! println!("PM base URL: {}", config.pm.base_url);
//! println!("Sync interval: {}s", config.sync.interval_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [pm]
//! base_url = "https://api.pm.example.com/fhir"
//! token_url = "https://api.pm.example.com/oauth/token"
//! client_id = "meridian"
//! client_secret = "${MERIDIAN_PM_CLIENT_SECRET}"
//!
//! [database]
//! connection_string = "postgresql://meridian@localhost:5432/meridian"
//!
//! [sync]
//! interval_seconds = 900
//! window_past_days = 30
//! window_future_days = 90
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseConfig, LoggingConfig, MeridianConfig, PmConfig, RetryConfig,
    ServerConfig, SyncConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
