//! Remote resource shapes
//!
//! The subset of the PM system's FHIR-flavored resources the sync engine
//! depends on. Every field the remote side may omit is optional here;
//! nothing in this module guesses at defaults — that's the transformers'
//! job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// A paginated resource bundle
///
/// Collections come back as `{ entry: [...], link: [{relation, url}] }`;
/// a `next` link relation means another page follows.
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle<T> {
    #[serde(default = "Vec::new")]
    pub entry: Vec<BundleEntry<T>>,

    #[serde(default = "Vec::new")]
    pub link: Vec<BundleLink>,
}

impl<T> Bundle<T> {
    /// URL of the next page, when present
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }

    /// Consumes the bundle and returns the contained resources
    pub fn into_resources(self) -> Vec<T> {
        self.entry.into_iter().map(|e| e.resource).collect()
    }
}

/// One bundle entry
#[derive(Debug, Clone, Deserialize)]
pub struct BundleEntry<T> {
    pub resource: T,
}

/// A bundle link relation
#[derive(Debug, Clone, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// FHIR HumanName
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumanName {
    #[serde(default)]
    pub family: Option<String>,

    #[serde(default = "Vec::new")]
    pub given: Vec<String>,

    #[serde(default)]
    pub text: Option<String>,
}

/// FHIR ContactPoint (telecom entry)
#[derive(Debug, Clone, Deserialize)]
pub struct ContactPoint {
    /// `phone`, `email`, ...
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub value: Option<String>,
}

/// FHIR Reference
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    /// `ResourceType/id`
    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub display: Option<String>,
}

/// FHIR CodeableConcept
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeableConcept {
    #[serde(default = "Vec::new")]
    pub coding: Vec<Coding>,

    #[serde(default)]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Best-effort display text: `text`, else the first coding's display,
    /// else the first coding's code
    pub fn display_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.coding.first().and_then(|c| c.display.as_deref()))
            .or_else(|| self.coding.first().and_then(|c| c.code.as_deref()))
    }
}

/// FHIR Coding
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Coding {
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub display: Option<String>,
}

/// FHIR Money (used inside extensions)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Money {
    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,
}

/// FHIR Extension with the value variants the PM system actually sends
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(default)]
    pub value_string: Option<String>,

    #[serde(default)]
    pub value_decimal: Option<f64>,

    #[serde(default)]
    pub value_integer: Option<i32>,

    #[serde(default)]
    pub value_boolean: Option<bool>,

    #[serde(default)]
    pub value_date: Option<NaiveDate>,

    #[serde(default)]
    pub value_date_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub value_money: Option<Money>,
}

/// A practitioner qualification entry
#[derive(Debug, Clone, Deserialize)]
pub struct Qualification {
    #[serde(default)]
    pub code: CodeableConcept,
}

/// Remote Practitioner resource
#[derive(Debug, Clone, Deserialize)]
pub struct PmPractitioner {
    pub id: String,

    #[serde(default)]
    pub active: Option<bool>,

    #[serde(default = "Vec::new")]
    pub name: Vec<HumanName>,

    #[serde(default = "Vec::new")]
    pub telecom: Vec<ContactPoint>,

    #[serde(default = "Vec::new")]
    pub qualification: Vec<Qualification>,

    #[serde(default = "Vec::new")]
    pub extension: Vec<Extension>,
}

/// Remote Patient resource
#[derive(Debug, Clone, Deserialize)]
pub struct PmPatient {
    pub id: String,

    #[serde(default)]
    pub active: Option<bool>,

    #[serde(default = "Vec::new")]
    pub name: Vec<HumanName>,

    #[serde(default = "Vec::new")]
    pub telecom: Vec<ContactPoint>,

    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<NaiveDate>,

    /// Owning practitioner reference(s)
    #[serde(rename = "generalPractitioner", default)]
    pub general_practitioner: Vec<Reference>,

    #[serde(default = "Vec::new")]
    pub extension: Vec<Extension>,
}

/// One appointment participant
#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub actor: Reference,

    #[serde(default)]
    pub status: Option<String>,
}

/// Remote Appointment resource
#[derive(Debug, Clone, Deserialize)]
pub struct PmAppointment {
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end: Option<DateTime<Utc>>,

    #[serde(rename = "serviceType", default)]
    pub service_type: Vec<CodeableConcept>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default = "Vec::new")]
    pub participant: Vec<Participant>,

    #[serde(default = "Vec::new")]
    pub extension: Vec<Extension>,
}

impl PmAppointment {
    /// The `Patient/...` participant reference, if any
    pub fn patient_reference(&self) -> Option<&str> {
        self.participant_reference("Patient/")
    }

    /// The `Practitioner/...` participant reference, if any
    pub fn practitioner_reference(&self) -> Option<&str> {
        self.participant_reference("Practitioner/")
    }

    fn participant_reference(&self, prefix: &str) -> Option<&str> {
        self.participant
            .iter()
            .filter_map(|p| p.actor.reference.as_deref())
            .find(|r| r.starts_with(prefix))
    }
}

/// Remote availability Slot resource
#[derive(Debug, Clone, Deserialize)]
pub struct PmSlot {
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// OAuth token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds
    pub expires_in: u64,
}
