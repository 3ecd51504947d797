//! Shared test doubles: an in-memory sync store and a scripted PM API stub
//!
//! Both implement the same traits the production adapters do, so the sync
//! engine under test is byte-for-byte the code that runs in production.

// Not every suite uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use meridian::adapters::pm::models::{
    ContactPoint, HumanName, Participant, PmAppointment, PmPatient, PmPractitioner, PmSlot,
    Reference,
};
use meridian::adapters::pm::PmApi;
use meridian::adapters::store::{SyncStore, Upserted};
use meridian::domain::{
    Client, ClientId, MeridianError, PmApiError, Practitioner, PractitionerId, RemoteId, Result,
    Session, SessionStatus, SyncLogEntry, SyncRunStatus, SyncType,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory [`SyncStore`] mirroring the PostgreSQL adapter's upsert
/// semantics: coalesce-with-existing on optional fields, `session_number`
/// and `mhcp_used_sessions` preserved on update.
#[derive(Default)]
pub struct MemoryStore {
    practitioners: Mutex<Vec<Practitioner>>,
    clients: Mutex<Vec<Client>>,
    sessions: Mutex<Vec<Session>>,
    logs: Mutex<Vec<SyncLogEntry>>,

    /// When set, sync-log writes fail (exercises the best-effort audit path)
    pub fail_log_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn practitioner_count(&self) -> usize {
        self.practitioners.lock().unwrap().len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn clients(&self) -> Vec<Client> {
        self.clients.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<SyncLogEntry> {
        self.logs.lock().unwrap().clone()
    }

    pub fn session_by_remote(&self, remote_id: &str) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.remote_id.as_str() == remote_id)
            .cloned()
    }

    pub fn client_by_remote(&self, remote_id: &str) -> Option<Client> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.remote_id.as_str() == remote_id)
            .cloned()
    }

    /// Seed a sync-log entry directly (status-reporter tests)
    pub fn push_log(&self, entry: SyncLogEntry) {
        self.logs.lock().unwrap().push(entry);
    }

    /// Seed a practitioner row directly
    pub fn push_practitioner(&self, practitioner: Practitioner) {
        self.practitioners.lock().unwrap().push(practitioner);
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_practitioner_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<Practitioner>> {
        Ok(self
            .practitioners
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.remote_id == remote_id)
            .cloned())
    }

    async fn find_practitioner_by_id(&self, id: PractitionerId) -> Result<Option<Practitioner>> {
        Ok(self
            .practitioners
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn upsert_practitioner(
        &self,
        practitioner: &Practitioner,
    ) -> Result<Upserted<Practitioner>> {
        let mut rows = self.practitioners.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|p| p.remote_id == practitioner.remote_id) {
            existing.remote_role_id = practitioner
                .remote_role_id
                .clone()
                .or(existing.remote_role_id.take());
            existing.first_name = practitioner.first_name.clone();
            existing.last_name = practitioner.last_name.clone();
            existing.display_name = practitioner.display_name.clone();
            existing.email = practitioner.email.clone();
            existing.phone = practitioner.phone.clone().or(existing.phone.take());
            existing.qualifications = practitioner
                .qualifications
                .clone()
                .or(existing.qualifications.take());
            existing.specialty = practitioner.specialty.clone().or(existing.specialty.take());
            existing.active = practitioner.active;
            existing.last_synced_at = practitioner.last_synced_at;
            return Ok(Upserted {
                entity: existing.clone(),
                created: false,
            });
        }
        rows.push(practitioner.clone());
        Ok(Upserted {
            entity: practitioner.clone(),
            created: true,
        })
    }

    async fn list_practitioners(&self) -> Result<Vec<Practitioner>> {
        Ok(self.practitioners.lock().unwrap().clone())
    }

    async fn find_client_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Client>> {
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.remote_id == remote_id)
            .cloned())
    }

    async fn upsert_client(&self, client: &Client) -> Result<Upserted<Client>> {
        let mut rows = self.clients.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|c| c.remote_id == client.remote_id) {
            existing.practitioner_id = client.practitioner_id;
            existing.first_name = client.first_name.clone();
            existing.last_name = client.last_name.clone();
            existing.initials = client.initials.clone();
            existing.email = client.email.clone().or(existing.email.take());
            existing.phone = client.phone.clone().or(existing.phone.take());
            existing.date_of_birth = client.date_of_birth.or(existing.date_of_birth);
            existing.mhcp_total_sessions =
                client.mhcp_total_sessions.or(existing.mhcp_total_sessions);
            // mhcp_used_sessions preserved; recomputed explicitly
            existing.mhcp_start_date = client.mhcp_start_date.or(existing.mhcp_start_date);
            existing.mhcp_expiry_date = client.mhcp_expiry_date.or(existing.mhcp_expiry_date);
            existing.presenting_issues = client
                .presenting_issues
                .clone()
                .or(existing.presenting_issues.take());
            existing.active = client.active;
            existing.last_synced_at = client.last_synced_at;
            return Ok(Upserted {
                entity: existing.clone(),
                created: false,
            });
        }
        rows.push(client.clone());
        Ok(Upserted {
            entity: client.clone(),
            created: true,
        })
    }

    async fn set_client_active(&self, remote_id: &RemoteId, active: bool) -> Result<bool> {
        let mut rows = self.clients.lock().unwrap();
        match rows.iter_mut().find(|c| &c.remote_id == remote_id) {
            Some(client) => {
                client.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_client_used_sessions(&self, client_id: ClientId, used: i32) -> Result<()> {
        let mut rows = self.clients.lock().unwrap();
        if let Some(client) = rows.iter_mut().find(|c| c.id == client_id) {
            client.mhcp_used_sessions = used;
        }
        Ok(())
    }

    async fn clients_for_practitioner(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Vec<Client>> {
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.practitioner_id == practitioner_id)
            .cloned()
            .collect())
    }

    async fn find_session_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.remote_id == remote_id)
            .cloned())
    }

    async fn upsert_session(&self, session: &Session) -> Result<Upserted<Session>> {
        let mut rows = self.sessions.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|s| s.remote_id == session.remote_id) {
            existing.practitioner_id = session.practitioner_id;
            existing.client_id = session.client_id;
            existing.scheduled_start = session.scheduled_start;
            existing.scheduled_end = session.scheduled_end;
            existing.actual_start = session.actual_start.or(existing.actual_start);
            existing.actual_end = session.actual_end.or(existing.actual_end);
            // session_number preserved; assigned once at first sync
            existing.status = session.status;
            existing.session_type = session.session_type.clone().or(existing.session_type.take());
            existing.is_telehealth = session.is_telehealth;
            existing.notes = session.notes.clone().or(existing.notes.take());
            existing.fee_amount = session.fee_amount.or(existing.fee_amount);
            existing.fee_currency = session.fee_currency.clone().or(existing.fee_currency.take());
            existing.paid = session.paid;
            existing.last_synced_at = session.last_synced_at;
            return Ok(Upserted {
                entity: existing.clone(),
                created: false,
            });
        }
        rows.push(session.clone());
        Ok(Upserted {
            entity: session.clone(),
            created: true,
        })
    }

    async fn set_session_status(
        &self,
        remote_id: &RemoteId,
        status: SessionStatus,
    ) -> Result<bool> {
        let mut rows = self.sessions.lock().unwrap();
        match rows.iter_mut().find(|s| &s.remote_id == remote_id) {
            Some(session) => {
                session.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_completed_sessions(
        &self,
        client_id: ClientId,
        practitioner_id: PractitionerId,
    ) -> Result<i64> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.client_id == client_id
                    && s.practitioner_id == practitioner_id
                    && s.status == SessionStatus::Completed
            })
            .count() as i64)
    }

    async fn insert_sync_log(&self, entry: &SyncLogEntry) -> Result<()> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(MeridianError::Database("log writes disabled".to_string()));
        }
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn update_sync_log(&self, entry: &SyncLogEntry) -> Result<()> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(MeridianError::Database("log writes disabled".to_string()));
        }
        let mut logs = self.logs.lock().unwrap();
        if let Some(existing) = logs.iter_mut().find(|l| l.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn last_completed_full_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.practitioner_id == Some(practitioner_id)
                    && l.sync_type == SyncType::Full
                    && l.status == SyncRunStatus::Success
            })
            .max_by_key(|l| l.completed_at)
            .cloned())
    }

    async fn last_incremental_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.practitioner_id == Some(practitioner_id)
                    && matches!(l.sync_type, SyncType::Incremental | SyncType::Webhook)
            })
            .max_by_key(|l| l.started_at)
            .cloned())
    }

    async fn last_error_entry(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.practitioner_id == Some(practitioner_id) && l.status == SyncRunStatus::Error
            })
            .max_by_key(|l| l.completed_at.unwrap_or(l.started_at))
            .cloned())
    }
}

/// Scripted [`PmApi`] stub
#[derive(Default)]
pub struct StubPm {
    pub practitioners: Mutex<HashMap<String, PmPractitioner>>,
    pub patients: Mutex<HashMap<String, PmPatient>>,
    pub patients_by_practitioner: Mutex<HashMap<String, Vec<PmPatient>>>,
    pub appointments_by_practitioner: Mutex<HashMap<String, Vec<PmAppointment>>>,

    pub fail_practitioner_fetch: AtomicBool,
    pub fail_patient_fetch: AtomicBool,
    pub fail_appointment_fetch: AtomicBool,
}

impl StubPm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_practitioner(&self, resource: PmPractitioner) {
        self.practitioners
            .lock()
            .unwrap()
            .insert(resource.id.clone(), resource);
    }

    pub fn add_patient(&self, practitioner_remote_id: &str, resource: PmPatient) {
        self.patients
            .lock()
            .unwrap()
            .insert(resource.id.clone(), resource.clone());
        self.patients_by_practitioner
            .lock()
            .unwrap()
            .entry(practitioner_remote_id.to_string())
            .or_default()
            .push(resource);
    }

    pub fn add_appointment(&self, practitioner_remote_id: &str, resource: PmAppointment) {
        self.appointments_by_practitioner
            .lock()
            .unwrap()
            .entry(practitioner_remote_id.to_string())
            .or_default()
            .push(resource);
    }
}

#[async_trait]
impl PmApi for StubPm {
    async fn get_practitioner(&self, remote_id: &RemoteId) -> Result<Option<PmPractitioner>> {
        if self.fail_practitioner_fetch.load(Ordering::SeqCst) {
            return Err(PmApiError::ConnectionFailed("stubbed outage".to_string()).into());
        }
        Ok(self
            .practitioners
            .lock()
            .unwrap()
            .get(remote_id.as_str())
            .cloned())
    }

    async fn get_all_practitioners(&self) -> Result<Vec<PmPractitioner>> {
        if self.fail_practitioner_fetch.load(Ordering::SeqCst) {
            return Err(PmApiError::ConnectionFailed("stubbed outage".to_string()).into());
        }
        Ok(self.practitioners.lock().unwrap().values().cloned().collect())
    }

    async fn get_patient(&self, remote_id: &RemoteId) -> Result<Option<PmPatient>> {
        if self.fail_patient_fetch.load(Ordering::SeqCst) {
            return Err(PmApiError::ConnectionFailed("stubbed outage".to_string()).into());
        }
        Ok(self.patients.lock().unwrap().get(remote_id.as_str()).cloned())
    }

    async fn get_patients_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
    ) -> Result<Vec<PmPatient>> {
        if self.fail_patient_fetch.load(Ordering::SeqCst) {
            return Err(PmApiError::ConnectionFailed("stubbed outage".to_string()).into());
        }
        Ok(self
            .patients_by_practitioner
            .lock()
            .unwrap()
            .get(practitioner_remote_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_appointments_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
        _start: chrono::DateTime<chrono::Utc>,
        _end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<PmAppointment>> {
        if self.fail_appointment_fetch.load(Ordering::SeqCst) {
            return Err(PmApiError::ConnectionFailed("stubbed outage".to_string()).into());
        }
        Ok(self
            .appointments_by_practitioner
            .lock()
            .unwrap()
            .get(practitioner_remote_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_appointments_with_patient_details(
        &self,
        practitioner_remote_id: &RemoteId,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<PmAppointment>> {
        self.get_appointments_by_practitioner(practitioner_remote_id, start, end)
            .await
    }

    async fn get_slots(
        &self,
        _practitioner_remote_id: &RemoteId,
        _start: chrono::DateTime<chrono::Utc>,
        _end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<PmSlot>> {
        Ok(Vec::new())
    }
}

// Resource builders

pub fn remote_practitioner(id: &str, first: &str, last: &str) -> PmPractitioner {
    PmPractitioner {
        id: id.to_string(),
        active: Some(true),
        name: vec![HumanName {
            family: Some(last.to_string()),
            given: vec![first.to_string()],
            text: None,
        }],
        telecom: vec![ContactPoint {
            system: Some("email".to_string()),
            value: Some(format!("{}@practice.example.com", first.to_lowercase())),
        }],
        qualification: vec![],
        extension: vec![],
    }
}

pub fn remote_patient(id: &str, first: &str, last: &str) -> PmPatient {
    PmPatient {
        id: id.to_string(),
        active: Some(true),
        name: vec![HumanName {
            family: Some(last.to_string()),
            given: vec![first.to_string()],
            text: None,
        }],
        telecom: vec![],
        birth_date: None,
        general_practitioner: vec![],
        extension: vec![],
    }
}

pub fn remote_appointment(id: &str, patient_id: &str, practitioner_id: &str, status: &str) -> PmAppointment {
    PmAppointment {
        id: id.to_string(),
        status: Some(status.to_string()),
        start: Some(Utc::now()),
        end: None,
        service_type: vec![],
        description: None,
        comment: None,
        participant: vec![
            Participant {
                actor: Reference {
                    reference: Some(format!("Practitioner/{practitioner_id}")),
                    display: None,
                },
                status: None,
            },
            Participant {
                actor: Reference {
                    reference: Some(format!("Patient/{patient_id}")),
                    display: None,
                },
                status: None,
            },
        ],
        extension: vec![],
    }
}
