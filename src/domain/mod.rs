//! Domain models and types for Meridian.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RemoteId`], [`PractitionerId`],
//!   [`ClientId`], [`SessionId`])
//! - **Local entities** ([`Practitioner`], [`Client`], [`Session`],
//!   [`SyncLogEntry`])
//! - **Error types** ([`MeridianError`], [`PmApiError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Meridian uses the newtype pattern for identifiers to prevent mixing
//! remote and local IDs:
//!
//! ```rust
//! use meridian::domain::{ClientId, RemoteId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = RemoteId::new("PAT-42")?;
//! let local = ClientId::generate();
//! // let wrong: ClientId = remote;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod errors;
pub mod ids;
pub mod practitioner;
pub mod result;
pub mod session;
pub mod sync_log;

// Re-export commonly used types for convenience
pub use client::Client;
pub use errors::{MeridianError, PmApiError};
pub use ids::{ClientId, PractitionerId, RemoteId, SessionId, SyncLogId};
pub use practitioner::Practitioner;
pub use result::Result;
pub use session::{Session, SessionStatus};
pub use sync_log::{SyncHealth, SyncLogEntry, SyncRunStatus, SyncScope, SyncType};
