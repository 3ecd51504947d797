//! Core business logic for Meridian.
//!
//! This module contains the sync engine and the pure logic around it.
//!
//! # Modules
//!
//! - [`sync`] - Full reconciliation and the incremental webhook path
//! - [`transform`] - Pure remote→local entity transformers
//! - [`status`] - Sync health derivation from the audit log
//!
//! # Full-Sync Workflow
//!
//! 1. **Practitioner**: upsert the practitioner record (fatal on failure)
//! 2. **Clients**: fetch and upsert the practitioner's patients (best-effort)
//! 3. **Sessions**: upsert appointments in the configured window,
//!    assigning per-client session numbers in discovery order
//! 4. **MHCP**: recompute each client's used-session count from
//!    completed-session history
//! 5. **Audit**: write the sync-log entry (best-effort)
//!
//! # Example
//!
//! ```rust,no_run
//! use meridian::adapters::pm::FhirPmClient;
//! use meridian::adapters::store::create_store;
//! use meridian::config::load_config;
//! use meridian::core::sync::{SyncOptions, SyncService};
//! use meridian::domain::RemoteId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("meridian.toml")?;
//!
//! let pm = Arc::new(FhirPmClient::new(&config.pm)?);
//! let store = create_store(&config).await?;
//! let service = SyncService::new(pm, store, SyncOptions::from(&config.sync));
//!
//! let result = service.full_sync(&RemoteId::new("PR-1")?).await;
//! println!("processed {} records", result.records_processed);
//! # Ok(())
//! # }
//! ```

pub mod status;
pub mod sync;
pub mod transform;
