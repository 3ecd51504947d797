//! Sync engine
//!
//! Full reconciliation ([`service`]), the incremental webhook path
//! ([`incremental`]), run results ([`result`]) and the best-effort audit
//! writer ([`audit`]).

pub mod audit;
pub mod incremental;
pub mod result;
pub mod service;

pub use incremental::SyncEvent;
pub use result::{SyncResult, SyncTally};
pub use service::{SyncOptions, SyncService};
