//! Practitioner transformer

use crate::adapters::pm::models::PmPractitioner;
use crate::core::transform::{display_name, find_extension, name_parts, telecom_value};
use crate::domain::{Practitioner, PractitionerId, RemoteId};
use chrono::Utc;

/// Map a remote practitioner onto a local entity
///
/// When the practitioner already exists locally, pass its id so the upsert
/// targets the same row; otherwise a fresh id is generated. A practitioner
/// record with no usable email gets a synthesized placeholder so the local
/// uniqueness constraint holds.
pub fn transform_practitioner(
    resource: &PmPractitioner,
    existing_id: Option<PractitionerId>,
) -> Practitioner {
    let remote_id = RemoteId::new(resource.id.clone())
        .unwrap_or_else(|_| RemoteId::new("unknown").expect("non-empty literal"));

    let (first_name, last_name) = name_parts(&resource.name);

    let email = telecom_value(&resource.telecom, "email")
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| placeholder_email(&remote_id));

    let qualifications = {
        let joined = resource
            .qualification
            .iter()
            .filter_map(|q| q.code.display_text())
            .collect::<Vec<_>>()
            .join(", ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    };

    let specialty = find_extension(&resource.extension, &["specialty"])
        .and_then(|ext| ext.value_string.clone());

    let remote_role_id = find_extension(&resource.extension, &["practitioner-role", "role-id"])
        .and_then(|ext| ext.value_string.clone());

    Practitioner {
        id: existing_id.unwrap_or_else(PractitionerId::generate),
        display_name: display_name(&resource.name),
        remote_id,
        remote_role_id,
        first_name,
        last_name,
        email,
        phone: telecom_value(&resource.telecom, "phone"),
        qualifications,
        specialty,
        active: resource.active.unwrap_or(true),
        last_synced_at: Utc::now(),
    }
}

/// Placeholder email for remote records carrying none
fn placeholder_email(remote_id: &RemoteId) -> String {
    format!("{remote_id}@placeholder.local")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pm::models::{
        CodeableConcept, ContactPoint, Extension, HumanName, Qualification,
    };

    fn remote_practitioner() -> PmPractitioner {
        PmPractitioner {
            id: "PR-1".to_string(),
            active: Some(true),
            name: vec![HumanName {
                family: Some("Whitfield".to_string()),
                given: vec!["Dana".to_string()],
                text: None,
            }],
            telecom: vec![
                ContactPoint {
                    system: Some("email".to_string()),
                    value: Some("dana@practice.example.com".to_string()),
                },
                ContactPoint {
                    system: Some("phone".to_string()),
                    value: Some("+61 2 9000 0000".to_string()),
                },
            ],
            qualification: vec![Qualification {
                code: CodeableConcept {
                    coding: vec![],
                    text: Some("MPsych (Clinical)".to_string()),
                },
            }],
            extension: vec![],
        }
    }

    #[test]
    fn test_transform_complete_record() {
        let p = transform_practitioner(&remote_practitioner(), None);

        assert_eq!(p.remote_id.as_str(), "PR-1");
        assert_eq!(p.first_name, "Dana");
        assert_eq!(p.last_name, "Whitfield");
        assert_eq!(p.display_name, "Dana Whitfield");
        assert_eq!(p.email, "dana@practice.example.com");
        assert_eq!(p.phone.as_deref(), Some("+61 2 9000 0000"));
        assert_eq!(p.qualifications.as_deref(), Some("MPsych (Clinical)"));
        assert!(p.active);
    }

    #[test]
    fn test_missing_email_gets_placeholder() {
        let mut resource = remote_practitioner();
        resource.telecom.retain(|t| t.system.as_deref() != Some("email"));

        let p = transform_practitioner(&resource, None);
        assert_eq!(p.email, "PR-1@placeholder.local");
    }

    #[test]
    fn test_blank_email_gets_placeholder() {
        let mut resource = remote_practitioner();
        for t in &mut resource.telecom {
            if t.system.as_deref() == Some("email") {
                t.value = Some("   ".to_string());
            }
        }

        let p = transform_practitioner(&resource, None);
        assert_eq!(p.email, "PR-1@placeholder.local");
    }

    #[test]
    fn test_existing_id_preserved() {
        let id = PractitionerId::generate();
        let p = transform_practitioner(&remote_practitioner(), Some(id));
        assert_eq!(p.id, id);
    }

    #[test]
    fn test_missing_name_defaults_to_empty() {
        let mut resource = remote_practitioner();
        resource.name.clear();

        let p = transform_practitioner(&resource, None);
        assert_eq!(p.first_name, "");
        assert_eq!(p.last_name, "");
    }

    #[test]
    fn test_role_and_specialty_extensions() {
        let mut resource = remote_practitioner();
        resource.extension = vec![
            Extension {
                url: "https://pm.example.com/ext/practitioner-role".to_string(),
                value_string: Some("ROLE-9".to_string()),
                ..Default::default()
            },
            Extension {
                url: "https://pm.example.com/ext/specialty".to_string(),
                value_string: Some("Clinical Psychology".to_string()),
                ..Default::default()
            },
        ];

        let p = transform_practitioner(&resource, None);
        assert_eq!(p.remote_role_id.as_deref(), Some("ROLE-9"));
        assert_eq!(p.specialty.as_deref(), Some("Clinical Psychology"));
    }
}
