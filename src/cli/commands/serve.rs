//! Serve command implementation
//!
//! Hosts the HTTP trigger surfaces (manual sync, webhook receiver, status)
//! and, when enabled, the scheduled sweep task.

use crate::adapters::pm::FhirPmClient;
use crate::adapters::store::create_store;
use crate::config::load_config;
use crate::core::status::StatusReporter;
use crate::core::sync::{SyncOptions, SyncService};
use crate::domain::{MeridianError, RemoteId};
use crate::server::{router, AppState};
use clap::Args;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the bind address from configuration
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting serve command");

        let config = match load_config(config_path) {
            Ok(c) => Arc::new(c),
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

        let service = Arc::new(SyncService::new(
            pm.clone(),
            store.clone(),
            SyncOptions::from(&config.sync),
        ));
        let reporter = Arc::new(StatusReporter::new(
            store,
            config.sync.stale_after_seconds,
        ));

        // Scheduled sweep task
        if config.sync.scheduled {
            let sweep_service = service.clone();
            let sweep_config = config.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(
                    sweep_config.sync.interval_seconds,
                ));
                // First tick fires immediately; skip it so startup isn't a sweep
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    run_sweep(&sweep_service, &sweep_config.pm.practitioner_id).await;
                }
            });
            tracing::info!(
                interval_seconds = config.sync.interval_seconds,
                "Scheduled sweep enabled"
            );
        }

        let state = AppState {
            service,
            reporter,
            pm,
            config: config.clone(),
        };
        let app = router(state);

        let bind = self.bind.clone().unwrap_or_else(|| config.server.bind_addr.clone());
        let addr: SocketAddr = match bind.parse() {
            Ok(addr) => addr,
            Err(e) => {
                println!("❌ Invalid bind address '{bind}': {e}");
                return Ok(2);
            }
        };

        println!("🚀 Meridian listening on http://{addr}");
        tracing::info!(addr = %addr, "HTTP server starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(0)
    }
}

/// One scheduled sweep: the bootstrap practitioner when configured,
/// otherwise every practitioner the PM system reports
async fn run_sweep(service: &SyncService, bootstrap: &Option<String>) {
    tracing::info!("Scheduled sweep starting");

    match bootstrap {
        Some(id) => match RemoteId::from_str(id) {
            Ok(remote_id) => {
                let result = service.full_sync(&remote_id).await;
                if !result.success {
                    tracing::error!(
                        practitioner = %remote_id,
                        errors = ?result.errors,
                        "Scheduled sweep failed"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "Invalid bootstrap practitioner id"),
        },
        None => {
            if let Err(e) = service.sync_all_practitioners().await {
                tracing::error!(error = %e, "Scheduled sweep failed to list practitioners");
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        } else {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_args_defaults() {
        let args = ServeArgs { bind: None };
        assert!(args.bind.is_none());
    }
}
