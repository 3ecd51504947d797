//! Sync command implementation
//!
//! One-shot manual sync: a single practitioner, the configured bootstrap
//! practitioner, or a sweep of every practitioner the PM system reports.

use crate::adapters::pm::FhirPmClient;
use crate::adapters::store::create_store;
use crate::config::load_config;
use crate::core::sync::{SyncOptions, SyncResult, SyncService};
use crate::domain::{MeridianError, RemoteId};
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Practitioner remote id to sync (defaults to pm.practitioner_id from
    /// configuration)
    #[arg(long)]
    pub practitioner: Option<String>,

    /// Sweep all practitioners even when a bootstrap id is configured
    #[arg(long)]
    pub all: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let pm = match FhirPmClient::new(&config.pm) {
            Ok(client) => Arc::new(client),
            Err(MeridianError::NotConfigured(msg)) => {
                println!("❌ Not configured: {msg}");
                return Ok(2);
            }
            Err(e) => {
                println!("❌ Failed to build PM client");
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        let store = match create_store(&config).await {
            Ok(store) => store,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let service = SyncService::new(pm, store, SyncOptions::from(&config.sync));

        let target = if self.all {
            None
        } else {
            self.practitioner
                .clone()
                .or_else(|| config.pm.practitioner_id.clone())
        };

        match target {
            Some(id) => {
                let remote_id = match RemoteId::from_str(&id) {
                    Ok(remote_id) => remote_id,
                    Err(e) => {
                        println!("❌ Invalid practitioner id: {e}");
                        return Ok(2);
                    }
                };

                let result = service.full_sync(&remote_id).await;
                print_result(&remote_id, &result);
                Ok(if result.success { 0 } else { 5 })
            }
            None => {
                println!("🔄 Syncing all practitioners");
                println!();

                let results = match service.sync_all_practitioners().await {
                    Ok(results) => results,
                    Err(e) => {
                        println!("❌ Failed to list practitioners from the PM system");
                        println!("   Error: {e}");
                        return Ok(4);
                    }
                };

                let mut failed = 0;
                for (remote_id, result) in &results {
                    print_result(remote_id, result);
                    if !result.success {
                        failed += 1;
                    }
                }

                println!();
                println!(
                    "Synced {} practitioner(s), {} failed",
                    results.len(),
                    failed
                );
                // Per-practitioner failures don't fail the sweep
                Ok(0)
            }
        }
    }
}

fn print_result(remote_id: &RemoteId, result: &SyncResult) {
    let marker = if result.success { "✅" } else { "❌" };
    println!(
        "{marker} {remote_id}: {} processed ({} created, {} updated, {} deleted) in {}ms",
        result.records_processed,
        result.records_created,
        result.records_updated,
        result.records_deleted,
        result.duration_ms
    );
    for error in &result.errors {
        println!("   ⚠ {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_args_defaults() {
        let args = SyncArgs {
            practitioner: None,
            all: false,
        };
        assert!(!args.all);
        assert!(args.practitioner.is_none());
    }
}
