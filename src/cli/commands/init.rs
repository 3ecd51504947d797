//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "meridian.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Meridian configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set MERIDIAN_PM_CLIENT_ID and MERIDIAN_PM_CLIENT_SECRET");
                println!("     - Set MERIDIAN_WEBHOOK_SECRET if the PM system signs webhooks");
                println!("  3. Validate configuration: meridian validate-config");
                println!("  4. Run a first sync: meridian sync");
                println!("  5. Or start the service: meridian serve");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate sample configuration
    fn generate_config() -> String {
        r#"# Meridian Configuration File
# Practice-management sync service

[application]
# Log level: trace, debug, info, warn, error
log_level = "info"

[pm]
# Base URL of the PM system's FHIR-flavored REST API
base_url = "https://api.pm.example.com/fhir"

# OAuth token endpoint (client-credential grant)
token_url = "https://api.pm.example.com/oauth/token"

# Credentials - use environment variable substitution, never literals
client_id = "${MERIDIAN_PM_CLIENT_ID}"
client_secret = "${MERIDIAN_PM_CLIENT_SECRET}"

# Optional organization scope
# organization_id = "ORG-1"

# Optional bootstrap practitioner: when set, `meridian sync` and the
# scheduled sweep target only this practitioner
# practitioner_id = "PR-1"

# Request timeout in seconds
timeout_seconds = 30

[pm.retry]
max_retries = 3
initial_delay_ms = 250
max_delay_ms = 10000
backoff_multiplier = 2.0

[database]
connection_string = "postgresql://meridian@localhost:5432/meridian"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60

[sync]
# Scheduled sweep interval (seconds); set scheduled = false to disable
interval_seconds = 900
scheduled = true

# Appointment window relative to now
window_past_days = 30
window_future_days = 90

# Age after which the last full sync is reported stale (seconds)
stale_after_seconds = 3600

[server]
bind_addr = "127.0.0.1:8520"

# Shared secret for webhook signature verification; signatures are not
# checked when unset
# webhook_secret = "${MERIDIAN_WEBHOOK_SECRET}"

[logging]
# Write rotating JSON log files in addition to console output
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }
}
