//! PM system adapter
//!
//! Everything that talks to the external practice-management platform:
//! the [`PmApi`] trait, the HTTP implementation, the OAuth token cache,
//! and the remote resource shapes.

pub mod auth;
pub mod client;
pub mod models;
pub mod traits;

pub use client::FhirPmClient;
pub use traits::PmApi;
