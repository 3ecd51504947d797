//! Practitioner entity
//!
//! The local representation of a PM-system practitioner. Created on first
//! sync of a remote practitioner and updated on every subsequent sync;
//! never hard-deleted (deactivation is a status flip).

use crate::domain::ids::{PractitionerId, RemoteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A practitioner row in the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    /// Locally generated identifier
    pub id: PractitionerId,

    /// Identifier assigned by the PM system (secondary unique key)
    pub remote_id: RemoteId,

    /// PractitionerRole identifier in the PM system, when known
    pub remote_role_id: Option<String>,

    pub first_name: String,

    pub last_name: String,

    /// Display name as shown in scheduling UIs
    pub display_name: String,

    /// Never null. A placeholder of the form `{remote_id}@placeholder.local`
    /// is synthesized when the remote record carries no email, to satisfy
    /// the local uniqueness constraint.
    pub email: String,

    pub phone: Option<String>,

    /// Qualification text, joined when the remote record carries several
    pub qualifications: Option<String>,

    pub specialty: Option<String>,

    pub active: bool,

    /// When this row was last reconciled with the PM system
    pub last_synced_at: DateTime<Utc>,
}

impl Practitioner {
    /// Full name, first then last, single-space separated
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
