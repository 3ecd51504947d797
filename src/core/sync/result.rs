//! Sync run results

use serde::Serialize;

/// Outcome of one sync run
///
/// `success` reflects the run's primary contract only: for a full sync that
/// is the practitioner upsert. Client/session sub-failures surface through
/// `errors` without flipping the flag.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub records_processed: usize,
    pub records_created: usize,
    pub records_updated: usize,
    pub records_deleted: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl SyncResult {
    /// An empty, so-far-successful result
    pub fn new() -> Self {
        Self {
            success: true,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            records_deleted: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// A failed result carrying one error
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            records_deleted: 0,
            errors: vec![error.into()],
            duration_ms,
        }
    }

    /// Record one upserted row
    pub fn track_upsert(&mut self, created: bool) {
        self.records_processed += 1;
        if created {
            self.records_created += 1;
        } else {
            self.records_updated += 1;
        }
    }

    /// Fold a tally of created/updated/deleted counts into this result
    pub fn absorb(&mut self, tally: SyncTally) {
        self.records_processed += tally.created + tally.updated + tally.deleted;
        self.records_created += tally.created;
        self.records_updated += tally.updated;
        self.records_deleted += tally.deleted;
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            success = self.success,
            processed = self.records_processed,
            created = self.records_created,
            updated = self.records_updated,
            deleted = self.records_deleted,
            error_count = self.errors.len(),
            duration_ms = self.duration_ms,
            "Sync run completed"
        );
        for error in &self.errors {
            tracing::warn!(operation = operation, error = %error, "Sync sub-error");
        }
    }
}

impl Default for SyncResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Created/updated/deleted counts from one dispatch step
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncTally {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncTally {
    /// Record one upserted row
    pub fn track_upsert(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }
}
