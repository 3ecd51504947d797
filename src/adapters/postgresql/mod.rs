//! PostgreSQL integration
//!
//! The production implementation of the local store: a pooled client plus
//! the [`PgSyncStore`] adapter.

pub mod client;
pub mod store;

pub use client::PostgresClient;
pub use store::PgSyncStore;
