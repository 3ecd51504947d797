//! Client entity
//!
//! The local representation of a PM-system patient. Meridian calls them
//! clients, matching practice terminology. Soft-deleted only (active flag).

use crate::domain::ids::{ClientId, PractitionerId, RemoteId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A client row in the local store
///
/// The MHCP pair tracks a mental-health-plan session quota: total sessions
/// allotted under the plan versus sessions already used. The used count is
/// always recomputed locally as the number of this client's completed
/// sessions with the owning practitioner — it is never accepted verbatim
/// from the PM system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Locally generated identifier
    pub id: ClientId,

    /// Identifier assigned by the PM system (secondary unique key)
    pub remote_id: RemoteId,

    /// Owning practitioner
    pub practitioner_id: PractitionerId,

    pub first_name: String,

    pub last_name: String,

    /// Two letters, uppercased; `?` stands in for a missing name part
    pub initials: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub date_of_birth: Option<NaiveDate>,

    /// Sessions allotted under the client's mental-health plan
    pub mhcp_total_sessions: Option<i32>,

    /// Completed-session count, recomputed on every sync
    pub mhcp_used_sessions: i32,

    pub mhcp_start_date: Option<NaiveDate>,

    pub mhcp_expiry_date: Option<NaiveDate>,

    /// Free-text presenting issues
    pub presenting_issues: Option<String>,

    pub active: bool,

    /// When this row was last reconciled with the PM system
    pub last_synced_at: DateTime<Utc>,
}

impl Client {
    /// Sessions remaining under the plan, when a quota is known
    pub fn mhcp_remaining_sessions(&self) -> Option<i32> {
        self.mhcp_total_sessions
            .map(|total| (total - self.mhcp_used_sessions).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Client {
        Client {
            id: ClientId::generate(),
            remote_id: RemoteId::new("PAT-1").unwrap(),
            practitioner_id: PractitionerId::generate(),
            first_name: "Alex".to_string(),
            last_name: "Moreno".to_string(),
            initials: "AM".to_string(),
            email: None,
            phone: None,
            date_of_birth: None,
            mhcp_total_sessions: Some(10),
            mhcp_used_sessions: 4,
            mhcp_start_date: None,
            mhcp_expiry_date: None,
            presenting_issues: None,
            active: true,
            last_synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_sessions() {
        assert_eq!(sample().mhcp_remaining_sessions(), Some(6));
    }

    #[test]
    fn test_remaining_sessions_never_negative() {
        let mut c = sample();
        c.mhcp_used_sessions = 12;
        assert_eq!(c.mhcp_remaining_sessions(), Some(0));
    }

    #[test]
    fn test_remaining_sessions_without_quota() {
        let mut c = sample();
        c.mhcp_total_sessions = None;
        assert_eq!(c.mhcp_remaining_sessions(), None);
    }
}
