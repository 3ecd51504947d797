//! Best-effort sync-log writer
//!
//! The audit trail is not a transactional participant: a failed log write
//! must never abort or fail the sync it describes. These helpers are the
//! only place in the codebase where errors are swallowed — they log their
//! own failure and always return.

use crate::adapters::store::SyncStore;
use crate::domain::SyncLogEntry;

/// Open a sync-log entry. Swallows store failures.
pub async fn record_start(store: &dyn SyncStore, entry: &SyncLogEntry) {
    if let Err(e) = store.insert_sync_log(entry).await {
        tracing::warn!(
            sync_log_id = %entry.id,
            operation = %entry.operation,
            error = %e,
            "Failed to write sync-log start entry (ignored)"
        );
    }
}

/// Complete a sync-log entry. Swallows store failures.
pub async fn record_completion(store: &dyn SyncStore, entry: &SyncLogEntry) {
    if let Err(e) = store.update_sync_log(entry).await {
        tracing::warn!(
            sync_log_id = %entry.id,
            operation = %entry.operation,
            status = %entry.status,
            error = %e,
            "Failed to write sync-log completion entry (ignored)"
        );
    }
}
