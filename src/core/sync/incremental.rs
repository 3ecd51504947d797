//! Sync service — incremental (event) path
//!
//! Webhook deliveries carry one changed resource. Dispatch maps the event
//! kind to a handler; appointment changes cascade-fetch any side of the
//! relationship that has never been synced locally, and cancellations and
//! deletions are soft — rows are never removed, status flips in place.

use crate::core::sync::audit;
use crate::core::sync::result::{SyncResult, SyncTally};
use crate::core::sync::service::SyncService;
use crate::core::transform::{transform_appointment, transform_patient, transform_practitioner};
use crate::core::transform::SessionContext;
use crate::domain::{
    MeridianError, RemoteId, Result, SessionStatus, SyncLogEntry, SyncScope, SyncType,
};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Inbound change-notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    AppointmentCreated,
    AppointmentUpdated,
    AppointmentCancelled,
    AppointmentDeleted,
    PatientCreated,
    PatientUpdated,
    PatientDeleted,
    PractitionerUpdated,
}

impl SyncEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEvent::AppointmentCreated => "appointment.created",
            SyncEvent::AppointmentUpdated => "appointment.updated",
            SyncEvent::AppointmentCancelled => "appointment.cancelled",
            SyncEvent::AppointmentDeleted => "appointment.deleted",
            SyncEvent::PatientCreated => "patient.created",
            SyncEvent::PatientUpdated => "patient.updated",
            SyncEvent::PatientDeleted => "patient.deleted",
            SyncEvent::PractitionerUpdated => "practitioner.updated",
        }
    }

    /// Entity scope for the audit log
    fn scope(&self) -> SyncScope {
        match self {
            SyncEvent::AppointmentCreated
            | SyncEvent::AppointmentUpdated
            | SyncEvent::AppointmentCancelled
            | SyncEvent::AppointmentDeleted => SyncScope::Session,
            SyncEvent::PatientCreated | SyncEvent::PatientUpdated | SyncEvent::PatientDeleted => {
                SyncScope::Client
            }
            SyncEvent::PractitionerUpdated => SyncScope::Practitioner,
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "appointment.created" => Ok(SyncEvent::AppointmentCreated),
            "appointment.updated" => Ok(SyncEvent::AppointmentUpdated),
            "appointment.cancelled" => Ok(SyncEvent::AppointmentCancelled),
            "appointment.deleted" => Ok(SyncEvent::AppointmentDeleted),
            "patient.created" => Ok(SyncEvent::PatientCreated),
            "patient.updated" => Ok(SyncEvent::PatientUpdated),
            "patient.deleted" => Ok(SyncEvent::PatientDeleted),
            "practitioner.updated" => Ok(SyncEvent::PractitionerUpdated),
            other => Err(format!("Unknown sync event: {other}")),
        }
    }
}

impl SyncService {
    /// Apply one change notification
    ///
    /// `resource` is the raw resource payload from the webhook body. The
    /// wrapping result is successful when dispatch succeeded; resolution
    /// failures (e.g. a patient with no resolvable practitioner) fail the
    /// event.
    pub async fn incremental_sync(
        &self,
        event: SyncEvent,
        resource: &serde_json::Value,
    ) -> SyncResult {
        let started = Instant::now();
        tracing::info!(event = %event, "Applying incremental sync event");

        let mut log_entry =
            SyncLogEntry::started(SyncType::Webhook, event.scope(), event.as_str(), None);
        audit::record_start(&**self.store(), &log_entry).await;

        let outcome = self.dispatch(event, resource, &mut log_entry).await;

        let mut result = match outcome {
            Ok(tally) => {
                let mut result = SyncResult::new();
                result.absorb(tally);
                result
            }
            Err(e) => {
                tracing::error!(event = %event, error = %e, "Incremental sync failed");
                SyncResult::failure(e.to_string(), 0)
            }
        };
        result.duration_ms = started.elapsed().as_millis() as u64;
        result.log_summary(event.as_str());

        let completed = if result.success {
            log_entry.complete_success(result.records_processed as i32)
        } else {
            log_entry.complete_error(result.errors.join("; "), 0)
        };
        audit::record_completion(&**self.store(), &completed).await;

        result
    }

    async fn dispatch(
        &self,
        event: SyncEvent,
        resource: &serde_json::Value,
        log_entry: &mut SyncLogEntry,
    ) -> Result<SyncTally> {
        match event {
            SyncEvent::AppointmentCreated | SyncEvent::AppointmentUpdated => {
                self.apply_appointment_change(resource, log_entry).await
            }
            SyncEvent::AppointmentCancelled | SyncEvent::AppointmentDeleted => {
                self.apply_appointment_cancellation(resource).await
            }
            SyncEvent::PatientCreated | SyncEvent::PatientUpdated => {
                self.apply_patient_change(resource, log_entry).await
            }
            SyncEvent::PatientDeleted => self.apply_patient_deletion(resource).await,
            SyncEvent::PractitionerUpdated => {
                self.apply_practitioner_update(resource, log_entry).await
            }
        }
    }

    /// Upsert a changed appointment, cascading practitioner/patient fetches
    /// for sides not yet known locally
    async fn apply_appointment_change(
        &self,
        resource: &serde_json::Value,
        log_entry: &mut SyncLogEntry,
    ) -> Result<SyncTally> {
        let appointment: crate::adapters::pm::models::PmAppointment =
            serde_json::from_value(resource.clone())?;

        let practitioner_ref = appointment.practitioner_reference().ok_or_else(|| {
            MeridianError::Resolution(format!(
                "appointment {} has no practitioner participant",
                appointment.id
            ))
        })?;
        let practitioner_remote_id =
            RemoteId::from_reference(practitioner_ref).map_err(MeridianError::Resolution)?;
        let practitioner = self.ensure_practitioner(&practitioner_remote_id).await?;
        log_entry.practitioner_id = Some(practitioner.id);

        let patient_ref = appointment.patient_reference().ok_or_else(|| {
            MeridianError::Resolution(format!(
                "appointment {} has no patient participant",
                appointment.id
            ))
        })?;
        let patient_remote_id =
            RemoteId::from_reference(patient_ref).map_err(MeridianError::Resolution)?;
        let client = self.ensure_client(&patient_remote_id, &practitioner).await?;

        let appointment_remote_id =
            RemoteId::new(appointment.id.clone()).map_err(MeridianError::Resolution)?;
        let existing = self
            .store()
            .find_session_by_remote_id(&appointment_remote_id)
            .await?;

        // Freshly computed number; preserved by the store when the session
        // already exists.
        let session_number = self
            .store()
            .count_completed_sessions(client.id, practitioner.id)
            .await? as i32
            + 1;

        let entity = transform_appointment(
            &appointment,
            SessionContext {
                existing_id: existing.map(|s| s.id),
                practitioner_id: practitioner.id,
                client_id: client.id,
                session_number,
            },
        );
        let upserted = self.store().upsert_session(&entity).await?;

        // Completed-session changes move the MHCP used count
        let used = self
            .store()
            .count_completed_sessions(client.id, practitioner.id)
            .await? as i32;
        self.store()
            .update_client_used_sessions(client.id, used)
            .await?;

        let mut tally = SyncTally::default();
        tally.track_upsert(upserted.created);
        Ok(tally)
    }

    /// Soft-cancel: flip the local row's status, never delete it
    async fn apply_appointment_cancellation(
        &self,
        resource: &serde_json::Value,
    ) -> Result<SyncTally> {
        let remote_id = resource_remote_id(resource)?;

        let mut tally = SyncTally::default();
        if self
            .store()
            .set_session_status(&remote_id, SessionStatus::Cancelled)
            .await?
        {
            tally.deleted += 1;
        } else {
            tracing::warn!(
                appointment = %remote_id,
                "Cancellation for an appointment that was never synced; ignoring"
            );
        }
        Ok(tally)
    }

    /// Upsert a changed patient, resolving the owning practitioner from the
    /// existing client row or the declared general practitioner
    async fn apply_patient_change(
        &self,
        resource: &serde_json::Value,
        log_entry: &mut SyncLogEntry,
    ) -> Result<SyncTally> {
        let patient: crate::adapters::pm::models::PmPatient =
            serde_json::from_value(resource.clone())?;
        let patient_remote_id =
            RemoteId::new(patient.id.clone()).map_err(MeridianError::Resolution)?;

        let existing = self.store().find_client_by_remote_id(&patient_remote_id).await?;

        let practitioner = match &existing {
            Some(client) => {
                // Keep the already-known owner
                self.find_practitioner_by_local_id(client.practitioner_id)
                    .await?
            }
            None => {
                let gp_ref = patient
                    .general_practitioner
                    .iter()
                    .filter_map(|r| r.reference.as_deref())
                    .find(|r| r.starts_with("Practitioner/"))
                    .ok_or_else(|| {
                        MeridianError::Resolution(format!(
                            "patient {} has no resolvable practitioner",
                            patient.id
                        ))
                    })?;
                let remote_id =
                    RemoteId::from_reference(gp_ref).map_err(MeridianError::Resolution)?;
                self.ensure_practitioner(&remote_id).await?
            }
        };
        log_entry.practitioner_id = Some(practitioner.id);

        let entity = transform_patient(&patient, existing.map(|c| c.id), practitioner.id);
        let upserted = self.store().upsert_client(&entity).await?;

        let mut tally = SyncTally::default();
        tally.track_upsert(upserted.created);
        Ok(tally)
    }

    /// Soft-delete: flip the client's active flag, never remove the row
    async fn apply_patient_deletion(&self, resource: &serde_json::Value) -> Result<SyncTally> {
        let remote_id = resource_remote_id(resource)?;

        let mut tally = SyncTally::default();
        if self.store().set_client_active(&remote_id, false).await? {
            tally.deleted += 1;
        } else {
            tracing::warn!(
                patient = %remote_id,
                "Deletion for a patient that was never synced; ignoring"
            );
        }
        Ok(tally)
    }

    /// Re-run the practitioner upsert from the delivered resource
    async fn apply_practitioner_update(
        &self,
        resource: &serde_json::Value,
        log_entry: &mut SyncLogEntry,
    ) -> Result<SyncTally> {
        let practitioner: crate::adapters::pm::models::PmPractitioner =
            serde_json::from_value(resource.clone())?;
        let remote_id =
            RemoteId::new(practitioner.id.clone()).map_err(MeridianError::Resolution)?;

        let existing = self.store().find_practitioner_by_remote_id(&remote_id).await?;
        let entity = transform_practitioner(&practitioner, existing.map(|p| p.id));
        let upserted = self.store().upsert_practitioner(&entity).await?;
        log_entry.practitioner_id = Some(upserted.entity.id);

        let mut tally = SyncTally::default();
        tally.track_upsert(upserted.created);
        Ok(tally)
    }

    async fn find_practitioner_by_local_id(
        &self,
        id: crate::domain::PractitionerId,
    ) -> Result<crate::domain::Practitioner> {
        // Local id came from the client row, so the practitioner must exist
        self.store().find_practitioner_by_id(id).await?.ok_or_else(|| {
            MeridianError::Resolution(format!("practitioner row {id} is missing"))
        })
    }
}

/// The `id` field of a raw resource payload
fn resource_remote_id(resource: &serde_json::Value) -> Result<RemoteId> {
    let id = resource
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MeridianError::Resolution("resource payload has no id".to_string()))?;
    RemoteId::new(id).map_err(MeridianError::Resolution)
}
