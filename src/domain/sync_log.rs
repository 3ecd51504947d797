//! Sync-log entry and related enumerations
//!
//! One row per sync attempt: type, entity scope, timing, outcome, record
//! count. Written best-effort — a failed log write never aborts the sync it
//! describes.

use crate::domain::ids::{PractitionerId, SyncLogId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the sync run was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Full,
    Incremental,
    Webhook,
    Manual,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::Incremental => "incremental",
            SyncType::Webhook => "webhook",
            SyncType::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SyncType::Full),
            "incremental" => Ok(SyncType::Incremental),
            "webhook" => Ok(SyncType::Webhook),
            "manual" => Ok(SyncType::Manual),
            other => Err(format!("Unknown sync type: {other}")),
        }
    }
}

/// Which entity kind a sync run covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncScope {
    Practitioner,
    Client,
    Session,
    All,
}

impl SyncScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncScope::Practitioner => "practitioner",
            SyncScope::Client => "client",
            SyncScope::Session => "session",
            SyncScope::All => "all",
        }
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practitioner" => Ok(SyncScope::Practitioner),
            "client" => Ok(SyncScope::Client),
            "session" => Ok(SyncScope::Session),
            "all" => Ok(SyncScope::All),
            other => Err(format!("Unknown sync scope: {other}")),
        }
    }
}

/// Lifecycle status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Pending,
    InProgress,
    Success,
    Error,
}

impl SyncRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRunStatus::Pending => "pending",
            SyncRunStatus::InProgress => "in_progress",
            SyncRunStatus::Success => "success",
            SyncRunStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncRunStatus::Pending),
            "in_progress" => Ok(SyncRunStatus::InProgress),
            "success" => Ok(SyncRunStatus::Success),
            "error" => Ok(SyncRunStatus::Error),
            other => Err(format!("Unknown sync run status: {other}")),
        }
    }
}

/// Coarse sync health derived from recent log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncHealth {
    Healthy,
    Stale,
    Error,
}

impl SyncHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncHealth::Healthy => "healthy",
            SyncHealth::Stale => "stale",
            SyncHealth::Error => "error",
        }
    }
}

impl fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sync-log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: SyncLogId,

    pub sync_type: SyncType,

    pub scope: SyncScope,

    /// Short operation label, e.g. `full_sync` or `appointment.updated`
    pub operation: String,

    pub status: SyncRunStatus,

    pub error_message: Option<String>,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub records_processed: i32,

    /// Practitioner the run was scoped to, when applicable
    pub practitioner_id: Option<PractitionerId>,
}

impl SyncLogEntry {
    /// Open a new in-progress entry stamped with the current time
    pub fn started(
        sync_type: SyncType,
        scope: SyncScope,
        operation: impl Into<String>,
        practitioner_id: Option<PractitionerId>,
    ) -> Self {
        Self {
            id: SyncLogId::generate(),
            sync_type,
            scope,
            operation: operation.into(),
            status: SyncRunStatus::InProgress,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
            records_processed: 0,
            practitioner_id,
        }
    }

    /// Close the entry as successful
    pub fn complete_success(mut self, records_processed: i32) -> Self {
        self.status = SyncRunStatus::Success;
        self.records_processed = records_processed;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Close the entry as failed
    pub fn complete_error(mut self, message: impl Into<String>, records_processed: i32) -> Self {
        self.status = SyncRunStatus::Error;
        self.error_message = Some(message.into());
        self.records_processed = records_processed;
        self.completed_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_lifecycle_success() {
        let entry = SyncLogEntry::started(SyncType::Full, SyncScope::All, "full_sync", None);
        assert_eq!(entry.status, SyncRunStatus::InProgress);
        assert!(entry.completed_at.is_none());

        let done = entry.complete_success(12);
        assert_eq!(done.status, SyncRunStatus::Success);
        assert_eq!(done.records_processed, 12);
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_entry_lifecycle_error() {
        let entry =
            SyncLogEntry::started(SyncType::Webhook, SyncScope::Session, "appointment.updated", None);
        let done = entry.complete_error("boom", 0);
        assert_eq!(done.status, SyncRunStatus::Error);
        assert_eq!(done.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_enum_text_roundtrips() {
        assert_eq!(SyncType::from_str("webhook").unwrap(), SyncType::Webhook);
        assert_eq!(SyncScope::from_str("all").unwrap(), SyncScope::All);
        assert_eq!(
            SyncRunStatus::from_str("in_progress").unwrap(),
            SyncRunStatus::InProgress
        );
        assert!(SyncType::from_str("cron").is_err());
    }

    #[test]
    fn test_health_as_str() {
        assert_eq!(SyncHealth::Stale.as_str(), "stale");
    }
}
