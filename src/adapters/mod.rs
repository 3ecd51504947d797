//! External system integrations for Meridian.
//!
//! This module provides adapters for the systems the sync engine talks to:
//!
//! - [`pm`] - The external practice-management platform (FHIR-flavored REST)
//! - [`store`] - Local store abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL implementation of the local store
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies
//! and enable testing with mock implementations. Both the PM client and the
//! store are trait objects injected into the sync service, so tests run
//! against scripted stubs and an in-memory store.
//!
//! ```rust,no_run
//! use meridian::adapters::pm::FhirPmClient;
//! use meridian::config::{PmConfig, secret_string};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PmConfig {
//!     base_url: "https://api.pm.example.com/fhir".to_string(),
//!     token_url: "https://api.pm.example.com/oauth/token".to_string(),
//!     client_id: Some("meridian".to_string()),
//!     client_secret: Some(secret_string("secret".to_string())),
//!     organization_id: None,
//!     practitioner_id: None,
//!     timeout_seconds: 30,
//!     rate_limit_per_minute: 120,
//!     retry: Default::default(),
//! };
//!
//! let client = FhirPmClient::new(&config)?;
//! // Use client for typed fetches
//! # Ok(())
//! # }
//! ```

pub mod pm;
pub mod postgresql;
pub mod store;
