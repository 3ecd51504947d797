//! Sync status reporting
//!
//! Derives a coarse health signal for a practitioner from recent sync-log
//! entries.

use crate::adapters::store::SyncStore;
use crate::domain::{RemoteId, Result, SyncHealth};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Sync status for one practitioner
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub practitioner_remote_id: String,
    pub last_full_sync: Option<DateTime<Utc>>,
    pub last_incremental_sync: Option<DateTime<Utc>>,
    pub health: SyncHealth,
    pub error_message: Option<String>,
}

/// Reads recent sync-log entries and derives health
pub struct StatusReporter {
    store: Arc<dyn SyncStore>,
    stale_after: Duration,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn SyncStore>, stale_after_seconds: i64) -> Self {
        Self {
            store,
            stale_after: Duration::seconds(stale_after_seconds),
        }
    }

    /// Health derivation, in priority order:
    ///
    /// 1. An error entry newer than the last completed full sync (or with
    ///    no full sync at all) → `error`
    /// 2. Last full sync older than the staleness threshold → `stale`
    /// 3. No full sync at all → `stale`
    /// 4. Otherwise → `healthy`
    pub async fn get_sync_status(&self, practitioner_remote_id: &RemoteId) -> Result<SyncStatus> {
        let Some(practitioner) = self
            .store
            .find_practitioner_by_remote_id(practitioner_remote_id)
            .await?
        else {
            // Never synced; nothing to report beyond staleness
            return Ok(SyncStatus {
                practitioner_remote_id: practitioner_remote_id.to_string(),
                last_full_sync: None,
                last_incremental_sync: None,
                health: SyncHealth::Stale,
                error_message: None,
            });
        };

        let last_full = self.store.last_completed_full_sync(practitioner.id).await?;
        let last_incremental = self.store.last_incremental_sync(practitioner.id).await?;
        let last_error = self.store.last_error_entry(practitioner.id).await?;

        let last_full_at = last_full.as_ref().and_then(|e| e.completed_at);
        let last_incremental_at = last_incremental
            .as_ref()
            .map(|e| e.completed_at.unwrap_or(e.started_at));

        let (health, error_message) = match (&last_error, last_full_at) {
            (Some(err), None) => (
                SyncHealth::Error,
                err.error_message.clone(),
            ),
            (Some(err), Some(full_at))
                if err.completed_at.unwrap_or(err.started_at) > full_at =>
            {
                (SyncHealth::Error, err.error_message.clone())
            }
            (_, Some(full_at)) if Utc::now() - full_at > self.stale_after => {
                (SyncHealth::Stale, None)
            }
            (_, None) => (SyncHealth::Stale, None),
            _ => (SyncHealth::Healthy, None),
        };

        Ok(SyncStatus {
            practitioner_remote_id: practitioner_remote_id.to_string(),
            last_full_sync: last_full_at,
            last_incremental_sync: last_incremental_at,
            health,
            error_message,
        })
    }
}
