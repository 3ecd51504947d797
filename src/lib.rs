// Meridian - practice-management sync service
// Copyright (c) 2026 Meridian Contributors
// Licensed under the MIT License

//! # Meridian - Practice-Management Sync Service
//!
//! Meridian reconciles practitioner, client and session records between an
//! external practice-management platform ("the PM system") and a local
//! PostgreSQL store, via two paths: a scheduled full reconciliation sweep
//! and an incremental webhook-driven update path.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Fetching** practitioners, patients, appointments and availability
//!   slots from the PM system's FHIR-flavored REST API, with OAuth
//!   client-credential authentication and transparent pagination
//! - **Transforming** remote resources into local entities, including
//!   status remapping and derived fields (initials, display names, session
//!   numbering)
//! - **Reconciling** via idempotent upserts keyed by remote identifier
//! - **Auditing** every sync run and deriving coarse health
//!   (healthy/stale/error) from the log
//!
//! ## Architecture
//!
//! Meridian follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (sync engine, transformers, status)
//! - [`adapters`] - External integrations (PM system, PostgreSQL)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`server`] - HTTP trigger surfaces (manual sync, webhook receiver)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian::adapters::pm::FhirPmClient;
//! use meridian::adapters::store::create_store;
//! use meridian::config::load_config;
//! use meridian::core::sync::{SyncOptions, SyncService};
//! use meridian::domain::RemoteId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = load_config("meridian.toml")?;
//!
//!     // Build the sync service with injected dependencies
//!     let pm = Arc::new(FhirPmClient::new(&config.pm)?);
//!     let store = create_store(&config).await?;
//!     let service = SyncService::new(pm, store, SyncOptions::from(&config.sync));
//!
//!     // Run a full reconciliation
//!     let result = service.full_sync(&RemoteId::new("PR-1")?).await;
//!
//!     println!("Processed {} records", result.records_processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Meridian uses the [`domain::MeridianError`] type for all errors:
//!
//! ```rust,no_run
//! use meridian::domain::MeridianError;
//!
//! fn example() -> Result<(), MeridianError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = meridian::config::load_config("meridian.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Meridian uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn, error};
//!
//! info!("Starting sync");
//! warn!(practitioner = "PR-1", "No appointments in window");
//! error!(error = "timeout", "Sync failed");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod server;
