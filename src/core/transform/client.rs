//! Client (patient) transformer

use crate::adapters::pm::models::PmPatient;
use crate::core::transform::{derive_initials, find_extension, name_parts, telecom_value};
use crate::domain::{Client, ClientId, PractitionerId, RemoteId};
use chrono::Utc;

/// Map a remote patient onto a local client entity
///
/// The MHCP used-session count is deliberately NOT taken from the remote
/// record — it starts at zero here and is recomputed from completed-session
/// history after every sync. The store's upsert preserves the existing
/// value on update.
pub fn transform_patient(
    resource: &PmPatient,
    existing_id: Option<ClientId>,
    practitioner_id: PractitionerId,
) -> Client {
    let remote_id = RemoteId::new(resource.id.clone())
        .unwrap_or_else(|_| RemoteId::new("unknown").expect("non-empty literal"));

    let (first_name, last_name) = name_parts(&resource.name);
    let initials = derive_initials(&first_name, &last_name);

    let mhcp_total_sessions =
        find_extension(&resource.extension, &["total-sessions", "sessions-approved"])
            .and_then(|ext| ext.value_integer);

    let mhcp_start_date = find_extension(&resource.extension, &["plan-start"])
        .and_then(|ext| ext.value_date);

    let mhcp_expiry_date = find_extension(&resource.extension, &["plan-expiry", "plan-end"])
        .and_then(|ext| ext.value_date);

    let presenting_issues = find_extension(&resource.extension, &["presenting-issues"])
        .and_then(|ext| ext.value_string.clone());

    Client {
        id: existing_id.unwrap_or_else(ClientId::generate),
        remote_id,
        practitioner_id,
        email: telecom_value(&resource.telecom, "email"),
        phone: telecom_value(&resource.telecom, "phone"),
        first_name,
        last_name,
        initials,
        date_of_birth: resource.birth_date,
        mhcp_total_sessions,
        mhcp_used_sessions: 0,
        mhcp_start_date,
        mhcp_expiry_date,
        presenting_issues,
        active: resource.active.unwrap_or(true),
        last_synced_at: Utc::now(),
    }
}
