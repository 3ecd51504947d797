//! Session entity and status enumeration
//!
//! The local representation of a PM-system appointment.

use crate::domain::ids::{ClientId, PractitionerId, RemoteId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Local session status
///
/// A closed enumeration; remote appointment statuses are remapped onto it by
/// `core::transform::map_appointment_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    /// Database/text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "confirmed" => Ok(SessionStatus::Confirmed),
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "no_show" => Ok(SessionStatus::NoShow),
            other => Err(format!("Unknown session status: {other}")),
        }
    }
}

/// A session row in the local store
///
/// `session_number` is sequential per (practitioner, client) pair, assigned
/// in discovery order during a sync pass. Once assigned to a remote
/// appointment identifier it is never reassigned on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Locally generated identifier
    pub id: SessionId,

    /// Identifier assigned by the PM system (secondary unique key)
    pub remote_id: RemoteId,

    pub practitioner_id: PractitionerId,

    pub client_id: ClientId,

    pub scheduled_start: DateTime<Utc>,

    pub scheduled_end: DateTime<Utc>,

    pub actual_start: Option<DateTime<Utc>>,

    pub actual_end: Option<DateTime<Utc>>,

    /// Sequential per (practitioner, client); assigned once, at first sync
    pub session_number: i32,

    pub status: SessionStatus,

    /// Service-type text from the remote appointment
    pub session_type: Option<String>,

    /// Inferred from service-type/description text; defaults to in-person
    pub is_telehealth: bool,

    pub notes: Option<String>,

    /// Fee taken from the remote extension list; never inferred from status
    pub fee_amount: Option<f64>,

    pub fee_currency: Option<String>,

    pub paid: bool,

    /// When this row was last reconciled with the PM system
    pub last_synced_at: DateTime<Utc>,
}

impl Session {
    /// Whether this session counts against the client's MHCP used total
    pub fn counts_toward_mhcp(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SessionStatus::Scheduled,
            SessionStatus::Confirmed,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::NoShow,
        ] {
            assert_eq!(SessionStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_unknown_rejected() {
        assert!(SessionStatus::from_str("booked").is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&SessionStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
    }

    #[test]
    fn test_only_completed_counts_toward_mhcp() {
        let mut session = Session {
            id: SessionId::generate(),
            remote_id: RemoteId::new("APT-1").unwrap(),
            practitioner_id: PractitionerId::generate(),
            client_id: ClientId::generate(),
            scheduled_start: chrono::Utc::now(),
            scheduled_end: chrono::Utc::now(),
            actual_start: None,
            actual_end: None,
            session_number: 1,
            status: SessionStatus::Completed,
            session_type: None,
            is_telehealth: false,
            notes: None,
            fee_amount: None,
            fee_currency: None,
            paid: false,
            last_synced_at: chrono::Utc::now(),
        };
        assert!(session.counts_toward_mhcp());

        session.status = SessionStatus::NoShow;
        assert!(!session.counts_toward_mhcp());
    }
}
