//! Session (appointment) transformer

use crate::adapters::pm::models::PmAppointment;
use crate::core::transform::{find_extension, map_appointment_status};
use crate::domain::{ClientId, PractitionerId, RemoteId, Session, SessionId};
use chrono::{Duration, Utc};

/// Default session length when the remote appointment has no end time
const DEFAULT_SESSION_MINUTES: i64 = 50;

/// Tokens marking a telehealth appointment in service-type/description text
const TELEHEALTH_TOKENS: [&str; 3] = ["telehealth", "video", "online"];

/// Local context needed to build a complete session
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    /// Existing local id when the session was synced before
    pub existing_id: Option<SessionId>,

    pub practitioner_id: PractitionerId,

    pub client_id: ClientId,

    /// Sequential number assigned in discovery order; the store preserves
    /// the stored value on update, so this only matters at first sync
    pub session_number: i32,
}

/// Map a remote appointment onto a local session entity
pub fn transform_appointment(resource: &PmAppointment, context: SessionContext) -> Session {
    let remote_id = RemoteId::new(resource.id.clone())
        .unwrap_or_else(|_| RemoteId::new("unknown").expect("non-empty literal"));

    let scheduled_start = resource.start.unwrap_or_else(Utc::now);
    let scheduled_end = resource
        .end
        .unwrap_or(scheduled_start + Duration::minutes(DEFAULT_SESSION_MINUTES));

    let status = map_appointment_status(resource.status.as_deref().unwrap_or(""));

    let session_type = resource
        .service_type
        .first()
        .and_then(|st| st.display_text())
        .map(|s| s.to_string());

    let is_telehealth = infer_telehealth(resource);

    let actual_start = find_extension(&resource.extension, &["actual-start"])
        .and_then(|ext| ext.value_date_time);
    let actual_end = find_extension(&resource.extension, &["actual-end"])
        .and_then(|ext| ext.value_date_time);

    let (fee_amount, fee_currency) = extract_fee(resource);
    let paid = extract_paid(resource);

    Session {
        id: context.existing_id.unwrap_or_else(SessionId::generate),
        remote_id,
        practitioner_id: context.practitioner_id,
        client_id: context.client_id,
        scheduled_start,
        scheduled_end,
        actual_start,
        actual_end,
        session_number: context.session_number,
        status,
        session_type,
        is_telehealth,
        notes: resource.comment.clone().or_else(|| resource.description.clone()),
        fee_amount,
        fee_currency,
        paid,
        last_synced_at: Utc::now(),
    }
}

/// Telehealth vs in-person, inferred by case-insensitive substring match
/// against service-type and description text. No match means in-person.
fn infer_telehealth(resource: &PmAppointment) -> bool {
    let mut texts: Vec<&str> = resource
        .service_type
        .iter()
        .filter_map(|st| st.display_text())
        .collect();
    if let Some(description) = resource.description.as_deref() {
        texts.push(description);
    }

    texts.iter().any(|text| {
        let lowered = text.to_ascii_lowercase();
        TELEHEALTH_TOKENS.iter().any(|token| lowered.contains(token))
    })
}

/// Fee amount/currency from the extension list, by URL substring match.
/// Absence yields `None` — a fee is never inferred from session status.
fn extract_fee(resource: &PmAppointment) -> (Option<f64>, Option<String>) {
    let Some(ext) = find_extension(&resource.extension, &["fee", "amount"]) else {
        return (None, None);
    };

    if let Some(money) = &ext.value_money {
        return (money.value, money.currency.clone());
    }
    (ext.value_decimal, None)
}

/// Paid flag from the extension list; absence yields `false`
fn extract_paid(resource: &PmAppointment) -> bool {
    let Some(ext) = find_extension(&resource.extension, &["paid", "payment-status"]) else {
        return false;
    };

    if let Some(paid) = ext.value_boolean {
        return paid;
    }
    matches!(ext.value_string.as_deref(), Some("paid") | Some("settled"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pm::models::{CodeableConcept, Extension, Money, Participant, Reference};
    use crate::domain::SessionStatus;
    use chrono::TimeZone;

    fn context() -> SessionContext {
        SessionContext {
            existing_id: None,
            practitioner_id: PractitionerId::generate(),
            client_id: ClientId::generate(),
            session_number: 3,
        }
    }

    fn remote_appointment() -> PmAppointment {
        PmAppointment {
            id: "APT-1".to_string(),
            status: Some("booked".to_string()),
            start: Some(Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2026, 8, 10, 9, 50, 0).unwrap()),
            service_type: vec![CodeableConcept {
                coding: vec![],
                text: Some("Standard consult".to_string()),
            }],
            description: None,
            comment: None,
            participant: vec![Participant {
                actor: Reference {
                    reference: Some("Patient/PAT-1".to_string()),
                    display: None,
                },
                status: None,
            }],
            extension: vec![],
        }
    }

    #[test]
    fn test_transform_basic_fields() {
        let ctx = context();
        let s = transform_appointment(&remote_appointment(), ctx);

        assert_eq!(s.remote_id.as_str(), "APT-1");
        assert_eq!(s.status, SessionStatus::Scheduled);
        assert_eq!(s.session_number, 3);
        assert_eq!(s.practitioner_id, ctx.practitioner_id);
        assert_eq!(s.client_id, ctx.client_id);
        assert_eq!(s.session_type.as_deref(), Some("Standard consult"));
        assert!(!s.is_telehealth);
        assert!(s.fee_amount.is_none());
        assert!(!s.paid);
    }

    #[test]
    fn test_missing_end_defaults_to_session_length() {
        let mut resource = remote_appointment();
        resource.end = None;

        let s = transform_appointment(&resource, context());
        assert_eq!(
            s.scheduled_end - s.scheduled_start,
            Duration::minutes(DEFAULT_SESSION_MINUTES)
        );
    }

    #[test]
    fn test_telehealth_inferred_from_service_type() {
        let mut resource = remote_appointment();
        resource.service_type = vec![CodeableConcept {
            coding: vec![],
            text: Some("Telehealth consult".to_string()),
        }];
        assert!(transform_appointment(&resource, context()).is_telehealth);
    }

    #[test]
    fn test_telehealth_inferred_from_description_case_insensitive() {
        let mut resource = remote_appointment();
        resource.description = Some("VIDEO session with Alex".to_string());
        assert!(transform_appointment(&resource, context()).is_telehealth);
    }

    #[test]
    fn test_fee_from_money_extension() {
        let mut resource = remote_appointment();
        resource.extension = vec![Extension {
            url: "https://pm.example.com/ext/appointment-fee".to_string(),
            value_money: Some(Money {
                value: Some(185.5),
                currency: Some("AUD".to_string()),
            }),
            ..Default::default()
        }];

        let s = transform_appointment(&resource, context());
        assert_eq!(s.fee_amount, Some(185.5));
        assert_eq!(s.fee_currency.as_deref(), Some("AUD"));
    }

    #[test]
    fn test_paid_from_payment_status_string() {
        let mut resource = remote_appointment();
        resource.extension = vec![Extension {
            url: "https://pm.example.com/ext/payment-status".to_string(),
            value_string: Some("paid".to_string()),
            ..Default::default()
        }];

        assert!(transform_appointment(&resource, context()).paid);
    }

    #[test]
    fn test_paid_never_inferred_from_status() {
        let mut resource = remote_appointment();
        resource.status = Some("fulfilled".to_string());

        let s = transform_appointment(&resource, context());
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(!s.paid);
    }
}
