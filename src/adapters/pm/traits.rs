//! PM system API trait
//!
//! The sync engine talks to the PM system through this trait so tests can
//! substitute a scripted stub for the HTTP client.

use crate::adapters::pm::models::{PmAppointment, PmPatient, PmPractitioner, PmSlot};
use crate::domain::{RemoteId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Typed fetch operations against the PM system
///
/// All collection fetches paginate transparently: implementations follow the
/// bundle `next` link relation until no further page is present.
#[async_trait]
pub trait PmApi: Send + Sync {
    /// Fetch one practitioner
    ///
    /// Returns `Ok(None)` only on a well-formed "not found" response; any
    /// other non-2xx response is an error carrying HTTP status and truncated
    /// body.
    async fn get_practitioner(&self, remote_id: &RemoteId) -> Result<Option<PmPractitioner>>;

    /// Fetch all practitioners visible to the configured credentials
    async fn get_all_practitioners(&self) -> Result<Vec<PmPractitioner>>;

    /// Fetch one patient
    async fn get_patient(&self, remote_id: &RemoteId) -> Result<Option<PmPatient>>;

    /// Fetch all patients belonging to a practitioner
    async fn get_patients_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
    ) -> Result<Vec<PmPatient>>;

    /// Fetch appointments for a practitioner within a window
    async fn get_appointments_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmAppointment>>;

    /// Same as [`Self::get_appointments_by_practitioner`] but with
    /// participant display names pre-joined from the referenced patients
    async fn get_appointments_with_patient_details(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmAppointment>>;

    /// Fetch availability slots for a practitioner within a window
    async fn get_slots(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmSlot>>;
}
