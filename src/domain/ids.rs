//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for the identifiers Meridian deals
//! with. Remote identifiers come from the PM system and are opaque strings;
//! local identifiers are generated here and are always UUIDs. The newtype
//! pattern keeps the two from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Remote identifier newtype wrapper
///
/// Represents an identifier assigned by the PM system (practitioner, patient,
/// appointment or slot). Opaque, but never empty.
///
/// # Examples
///
/// ```
/// use meridian::domain::ids::RemoteId;
/// use std::str::FromStr;
///
/// let id = RemoteId::from_str("PR-1042").unwrap();
/// assert_eq!(id.as_str(), "PR-1042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a new RemoteId from a string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the identifier is empty or whitespace-only
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Remote ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the remote ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Extract the trailing id from a FHIR reference string
    ///
    /// References arrive as `Patient/123`, `Practitioner/abc`, or
    /// occasionally as a bare id. The resource-type prefix is dropped; an
    /// empty result is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use meridian::domain::ids::RemoteId;
    ///
    /// let id = RemoteId::from_reference("Patient/PAT-1").unwrap();
    /// assert_eq!(id.as_str(), "PAT-1");
    /// ```
    pub fn from_reference(reference: &str) -> Result<Self, String> {
        let id = reference.rsplit('/').next().unwrap_or(reference);
        Self::new(id)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RemoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! local_uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh v4 identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| format!("Invalid {}: {}", stringify!($name), e))
            }
        }
    };
}

local_uuid_id! {
    /// Locally generated practitioner identifier
    PractitionerId
}

local_uuid_id! {
    /// Locally generated client identifier
    ClientId
}

local_uuid_id! {
    /// Locally generated session identifier
    SessionId
}

local_uuid_id! {
    /// Locally generated sync-log identifier
    SyncLogId
}
