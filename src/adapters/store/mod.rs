//! Local store abstraction
//!
//! This module defines the trait the sync engine persists through, plus the
//! factory that builds the production PostgreSQL implementation. Tests
//! substitute an in-memory implementation.

use crate::config::MeridianConfig;
use crate::domain::{
    Client, ClientId, Practitioner, PractitionerId, RemoteId, Result, Session, SessionStatus,
    SyncLogEntry,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of an upsert: the row as stored, and whether it was inserted
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub entity: T,
    pub created: bool,
}

/// Persistence operations the sync engine depends on
///
/// Every write is an idempotent upsert keyed by remote identifier, so a sync
/// terminated mid-flight converges when re-run. Upserts preserve fields the
/// incoming value leaves unset (coalesce-with-existing); `session_number`
/// and `mhcp_used_sessions` are never overwritten by an upsert — the first
/// is assigned once at insert, the second is recomputed explicitly.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Cheap connectivity probe
    async fn ping(&self) -> Result<()>;

    // Practitioners

    async fn find_practitioner_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<Practitioner>>;

    async fn find_practitioner_by_id(
        &self,
        id: PractitionerId,
    ) -> Result<Option<Practitioner>>;

    async fn upsert_practitioner(&self, practitioner: &Practitioner)
        -> Result<Upserted<Practitioner>>;

    async fn list_practitioners(&self) -> Result<Vec<Practitioner>>;

    // Clients

    async fn find_client_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Client>>;

    async fn upsert_client(&self, client: &Client) -> Result<Upserted<Client>>;

    /// Soft delete / reactivate. Returns false when no such client exists.
    async fn set_client_active(&self, remote_id: &RemoteId, active: bool) -> Result<bool>;

    /// Persist a recomputed used-session count
    async fn update_client_used_sessions(&self, client_id: ClientId, used: i32) -> Result<()>;

    async fn clients_for_practitioner(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Vec<Client>>;

    // Sessions

    async fn find_session_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Session>>;

    async fn upsert_session(&self, session: &Session) -> Result<Upserted<Session>>;

    /// In-place status flip (cancellations). Returns false when no such
    /// session exists.
    async fn set_session_status(&self, remote_id: &RemoteId, status: SessionStatus)
        -> Result<bool>;

    /// Count of a client's sessions with status `completed` belonging to
    /// the given practitioner
    async fn count_completed_sessions(
        &self,
        client_id: ClientId,
        practitioner_id: PractitionerId,
    ) -> Result<i64>;

    // Sync log

    async fn insert_sync_log(&self, entry: &SyncLogEntry) -> Result<()>;

    async fn update_sync_log(&self, entry: &SyncLogEntry) -> Result<()>;

    /// Most recent successfully completed full sync for a practitioner
    async fn last_completed_full_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>>;

    /// Most recent incremental/webhook run for a practitioner
    async fn last_incremental_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>>;

    /// Most recent error-status entry for a practitioner
    async fn last_error_entry(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>>;
}

/// Build the production store from configuration
///
/// Connects the pool, applies the initial schema, and verifies
/// connectivity.
pub async fn create_store(config: &MeridianConfig) -> Result<Arc<dyn SyncStore>> {
    let client = crate::adapters::postgresql::PostgresClient::new(config.database.clone()).await?;
    client.ensure_schema().await?;
    let store = crate::adapters::postgresql::PgSyncStore::new(client);
    store.ping().await?;
    Ok(Arc::new(store))
}
