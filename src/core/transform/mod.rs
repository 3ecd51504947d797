//! Entity transformers
//!
//! Pure remote→local mapping, no I/O. Each transformer takes a remote
//! resource plus enough local context (existing local id, foreign keys, a
//! computed session number) and returns a complete local entity value,
//! never partially filled.

pub mod client;
pub mod practitioner;
pub mod session;
pub mod status;

pub use client::transform_patient;
pub use practitioner::transform_practitioner;
pub use session::{transform_appointment, SessionContext};
pub use status::map_appointment_status;

use crate::adapters::pm::models::{ContactPoint, Extension, HumanName};

/// First and last name from a FHIR name list
///
/// Reads the first name entry; given names are space-joined. Missing parts
/// default to the empty string.
pub(crate) fn name_parts(names: &[HumanName]) -> (String, String) {
    let Some(name) = names.first() else {
        return (String::new(), String::new());
    };
    let first = name.given.join(" ");
    let last = name.family.clone().unwrap_or_default();
    (first, last)
}

/// Display text for a FHIR name list: `text` when present, else
/// "first last"
pub(crate) fn display_name(names: &[HumanName]) -> String {
    if let Some(text) = names.first().and_then(|n| n.text.clone()) {
        if !text.trim().is_empty() {
            return text;
        }
    }
    let (first, last) = name_parts(names);
    format!("{first} {last}").trim().to_string()
}

/// First telecom value for a system (`email`, `phone`), skipping blanks
pub(crate) fn telecom_value(telecom: &[ContactPoint], system: &str) -> Option<String> {
    telecom
        .iter()
        .filter(|t| t.system.as_deref() == Some(system))
        .filter_map(|t| t.value.clone())
        .find(|v| !v.trim().is_empty())
}

/// Two-letter initials: first letter of each name part, uppercased, `?`
/// standing in for an empty part
pub fn derive_initials(first_name: &str, last_name: &str) -> String {
    let first = first_name.chars().next().map(|c| c.to_ascii_uppercase());
    let last = last_name.chars().next().map(|c| c.to_ascii_uppercase());
    format!("{}{}", first.unwrap_or('?'), last.unwrap_or('?'))
}

/// First extension whose URL contains any of the given tokens
/// (case-insensitive)
pub(crate) fn find_extension<'a>(
    extensions: &'a [Extension],
    tokens: &[&str],
) -> Option<&'a Extension> {
    extensions.iter().find(|ext| {
        let url = ext.url.to_ascii_lowercase();
        tokens.iter().any(|token| url.contains(token))
    })
}
