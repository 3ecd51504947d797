//! Sync service — full reconciliation
//!
//! Orchestrates the practitioner→clients→sessions dependency chain against
//! the PM system. The chain is strictly sequential because later steps need
//! identifiers produced by earlier steps; concurrency across practitioners
//! is left to the store's upsert semantics.

use crate::adapters::pm::PmApi;
use crate::adapters::store::{SyncStore, Upserted};
use crate::config::SyncConfig;
use crate::core::sync::audit;
use crate::core::sync::result::{SyncResult, SyncTally};
use crate::core::transform::{transform_appointment, transform_patient, transform_practitioner};
use crate::core::transform::SessionContext;
use crate::domain::{
    Client, MeridianError, Practitioner, RemoteId, Result, SyncLogEntry, SyncScope, SyncType,
};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Tunables for a sync run
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Appointment window: days into the past
    pub window_past_days: i64,

    /// Appointment window: days into the future
    pub window_future_days: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            window_past_days: 30,
            window_future_days: 90,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            window_past_days: config.window_past_days,
            window_future_days: config.window_future_days,
        }
    }
}

/// The sync engine
///
/// Constructed once at process start with an injected PM client and store,
/// then shared by reference into whatever trigger surface invokes it. No
/// hidden module-level state.
pub struct SyncService {
    pm: Arc<dyn PmApi>,
    store: Arc<dyn SyncStore>,
    options: SyncOptions,
}

impl SyncService {
    pub fn new(pm: Arc<dyn PmApi>, store: Arc<dyn SyncStore>, options: SyncOptions) -> Self {
        Self { pm, store, options }
    }

    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    /// Full reconciliation for one practitioner
    ///
    /// Strictly ordered:
    /// 1. Upsert the practitioner — failure aborts the run (`success:
    ///    false`); practitioner identity is the hard prerequisite for
    ///    everything else.
    /// 2. Best-effort: fetch and upsert all of the practitioner's clients.
    /// 3. Best-effort: upsert appointments in the configured window as
    ///    sessions, skipping (warn, not error) any whose participant can't
    ///    be resolved to an already-synced client.
    /// 4. Recompute each client's MHCP used-session count.
    /// 5. Write the audit entry (best-effort).
    ///
    /// The run is successful iff step 1 succeeded; sub-failures from steps
    /// 2–4 only land in `errors`.
    pub async fn full_sync(&self, practitioner_remote_id: &RemoteId) -> SyncResult {
        let started = Instant::now();
        tracing::info!(practitioner = %practitioner_remote_id, "Starting full sync");

        // Attach the log entry to an already-known local practitioner when
        // there is one, so early failures still land on the right row.
        let known_practitioner_id = self
            .store
            .find_practitioner_by_remote_id(practitioner_remote_id)
            .await
            .ok()
            .flatten()
            .map(|p| p.id);

        let mut log_entry = SyncLogEntry::started(
            SyncType::Full,
            SyncScope::All,
            "full_sync",
            known_practitioner_id,
        );
        audit::record_start(&*self.store, &log_entry).await;

        let mut result = SyncResult::new();

        // Step 1: practitioner identity (fatal on failure)
        let practitioner = match self.sync_practitioner(practitioner_remote_id).await {
            Ok(upserted) => {
                result.track_upsert(upserted.created);
                upserted.entity
            }
            Err(e) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::error!(
                    practitioner = %practitioner_remote_id,
                    error = %e,
                    "Practitioner sync failed, aborting run"
                );
                let failed = SyncResult::failure(format!("practitioner sync failed: {e}"), duration_ms);
                audit::record_completion(
                    &*self.store,
                    &log_entry.complete_error(e.to_string(), 0),
                )
                .await;
                return failed;
            }
        };
        log_entry.practitioner_id = Some(practitioner.id);

        // Step 2: clients (best-effort)
        match self.sync_clients(&practitioner).await {
            Ok(tally) => result.absorb(tally),
            Err(e) => {
                tracing::warn!(
                    practitioner = %practitioner_remote_id,
                    error = %e,
                    "Client sync failed, continuing"
                );
                result.errors.push(format!("client sync failed: {e}"));
            }
        }

        // Step 3: sessions (best-effort)
        match self.sync_sessions(&practitioner).await {
            Ok(tally) => result.absorb(tally),
            Err(e) => {
                tracing::warn!(
                    practitioner = %practitioner_remote_id,
                    error = %e,
                    "Session sync failed, continuing"
                );
                result.errors.push(format!("session sync failed: {e}"));
            }
        }

        // Step 4: MHCP used counts
        if let Err(e) = self.recompute_used_sessions(&practitioner).await {
            tracing::warn!(
                practitioner = %practitioner_remote_id,
                error = %e,
                "Used-session recompute failed, continuing"
            );
            result.errors.push(format!("used-session recompute failed: {e}"));
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        result.log_summary("full_sync");

        // Step 5: audit entry (best-effort, never flips the result)
        let completed = if result.errors.is_empty() {
            log_entry.complete_success(result.records_processed as i32)
        } else {
            // Partial: the run itself succeeded, the entry records the detail
            let mut entry = log_entry.complete_success(result.records_processed as i32);
            entry.error_message = Some(result.errors.join("; "));
            entry
        };
        audit::record_completion(&*self.store, &completed).await;

        result
    }

    /// Full sync for every practitioner the PM system reports, sequentially
    ///
    /// Per-practitioner failures never abort the sweep; only a total
    /// inability to list practitioners is an error.
    pub async fn sync_all_practitioners(&self) -> Result<Vec<(RemoteId, SyncResult)>> {
        let practitioners = self.pm.get_all_practitioners().await?;
        tracing::info!(count = practitioners.len(), "Sweeping practitioners");

        let mut results = Vec::with_capacity(practitioners.len());
        for resource in practitioners {
            let Ok(remote_id) = RemoteId::new(resource.id.clone()) else {
                tracing::warn!("Skipping practitioner with empty remote id");
                continue;
            };
            let result = self.full_sync(&remote_id).await;
            results.push((remote_id, result));
        }
        Ok(results)
    }

    /// Fetch, transform and upsert one practitioner
    pub(crate) async fn sync_practitioner(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Upserted<Practitioner>> {
        let resource = self.pm.get_practitioner(remote_id).await?.ok_or_else(|| {
            MeridianError::Resolution(format!(
                "practitioner {remote_id} not found in the PM system"
            ))
        })?;

        let existing = self.store.find_practitioner_by_remote_id(remote_id).await?;
        let entity = transform_practitioner(&resource, existing.map(|p| p.id));
        self.store.upsert_practitioner(&entity).await
    }

    /// Fetch and upsert all clients belonging to a practitioner
    async fn sync_clients(&self, practitioner: &Practitioner) -> Result<SyncTally> {
        let patients = self
            .pm
            .get_patients_by_practitioner(&practitioner.remote_id)
            .await?;

        tracing::debug!(
            practitioner = %practitioner.remote_id,
            count = patients.len(),
            "Fetched patients"
        );

        let mut tally = SyncTally::default();
        for patient in patients {
            let Ok(remote_id) = RemoteId::new(patient.id.clone()) else {
                tracing::warn!("Skipping patient with empty remote id");
                continue;
            };
            let existing = self.store.find_client_by_remote_id(&remote_id).await?;
            let entity = transform_patient(&patient, existing.map(|c| c.id), practitioner.id);
            let upserted = self.store.upsert_client(&entity).await?;
            tally.track_upsert(upserted.created);
        }
        Ok(tally)
    }

    /// Fetch and upsert appointments in the configured window as sessions
    ///
    /// Session numbers: one running counter per client, seeded from the
    /// count of that client's existing completed sessions, incremented once
    /// per appointment processed. The store preserves numbers already
    /// assigned, so re-syncing an appointment never renumbers it.
    async fn sync_sessions(&self, practitioner: &Practitioner) -> Result<SyncTally> {
        let now = Utc::now();
        let window_start = now - Duration::days(self.options.window_past_days);
        let window_end = now + Duration::days(self.options.window_future_days);

        let appointments = self
            .pm
            .get_appointments_by_practitioner(&practitioner.remote_id, window_start, window_end)
            .await?;

        tracing::debug!(
            practitioner = %practitioner.remote_id,
            count = appointments.len(),
            "Fetched appointments"
        );

        let mut counters: HashMap<crate::domain::ClientId, i32> = HashMap::new();
        let mut tally = SyncTally::default();

        for appointment in appointments {
            let Some(patient_ref) = appointment.patient_reference() else {
                tracing::warn!(
                    appointment = %appointment.id,
                    "Skipping appointment without a patient participant"
                );
                continue;
            };
            let Ok(patient_remote_id) = RemoteId::from_reference(patient_ref) else {
                tracing::warn!(
                    appointment = %appointment.id,
                    reference = patient_ref,
                    "Skipping appointment with malformed patient reference"
                );
                continue;
            };

            let Some(client) = self.store.find_client_by_remote_id(&patient_remote_id).await?
            else {
                tracing::warn!(
                    appointment = %appointment.id,
                    patient = %patient_remote_id,
                    "Skipping appointment for a patient that is not synced locally"
                );
                continue;
            };

            let counter = match counters.get(&client.id) {
                Some(current) => current + 1,
                None => {
                    let completed = self
                        .store
                        .count_completed_sessions(client.id, practitioner.id)
                        .await? as i32;
                    completed + 1
                }
            };
            counters.insert(client.id, counter);

            let existing = self
                .store
                .find_session_by_remote_id(
                    &RemoteId::new(appointment.id.clone())
                        .map_err(MeridianError::Resolution)?,
                )
                .await?;

            let entity = transform_appointment(
                &appointment,
                SessionContext {
                    existing_id: existing.map(|s| s.id),
                    practitioner_id: practitioner.id,
                    client_id: client.id,
                    session_number: counter,
                },
            );
            let upserted = self.store.upsert_session(&entity).await?;
            tally.track_upsert(upserted.created);
        }

        Ok(tally)
    }

    /// Recompute every client's used-session count from completed-session
    /// history and persist it
    async fn recompute_used_sessions(&self, practitioner: &Practitioner) -> Result<()> {
        let clients = self.store.clients_for_practitioner(practitioner.id).await?;
        for client in clients {
            let used = self
                .store
                .count_completed_sessions(client.id, practitioner.id)
                .await? as i32;
            if used != client.mhcp_used_sessions {
                tracing::debug!(
                    client = %client.remote_id,
                    previous = client.mhcp_used_sessions,
                    recomputed = used,
                    "Updating MHCP used-session count"
                );
            }
            self.store
                .update_client_used_sessions(client.id, used)
                .await?;
        }
        Ok(())
    }

    /// Resolve a practitioner to a local row, fetching from the PM system
    /// when it has never been synced
    pub(crate) async fn ensure_practitioner(&self, remote_id: &RemoteId) -> Result<Practitioner> {
        if let Some(existing) = self.store.find_practitioner_by_remote_id(remote_id).await? {
            return Ok(existing);
        }
        tracing::info!(practitioner = %remote_id, "Cascading practitioner fetch");
        Ok(self.sync_practitioner(remote_id).await?.entity)
    }

    /// Resolve a patient to a local client row, fetching from the PM system
    /// when it has never been synced
    pub(crate) async fn ensure_client(
        &self,
        remote_id: &RemoteId,
        practitioner: &Practitioner,
    ) -> Result<Client> {
        if let Some(existing) = self.store.find_client_by_remote_id(remote_id).await? {
            return Ok(existing);
        }
        tracing::info!(patient = %remote_id, "Cascading patient fetch");
        let resource = self.pm.get_patient(remote_id).await?.ok_or_else(|| {
            MeridianError::Resolution(format!("patient {remote_id} not found in the PM system"))
        })?;
        let entity = transform_patient(&resource, None, practitioner.id);
        Ok(self.store.upsert_client(&entity).await?.entity)
    }
}
