//! PM system HTTP client
//!
//! Talks to the PM system's FHIR-flavored REST API with client-credential
//! OAuth, transparent bundle pagination, and rate-limit-aware retry.

use crate::adapters::pm::auth::TokenCache;
use crate::adapters::pm::models::{
    Bundle, PmAppointment, PmPatient, PmPractitioner, PmSlot, TokenResponse,
};
use crate::adapters::pm::traits::PmApi;
use crate::config::{PmConfig, SecretString};
use crate::domain::{MeridianError, PmApiError, RemoteId, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// Page size requested from the PM system
const PAGE_SIZE: usize = 100;

/// HTTP client for the PM system
///
/// Owns its token cache; no module-level state. Construct once at process
/// start and share behind an `Arc<dyn PmApi>`.
pub struct FhirPmClient {
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    organization_id: Option<String>,
    http: Client,
    token: TokenCache,
    retry: crate::config::RetryConfig,
}

impl FhirPmClient {
    /// Create a new PM client from configuration
    ///
    /// # Errors
    ///
    /// Returns `MeridianError::NotConfigured` when OAuth credentials are
    /// missing — checked here so no sync attempt ever reaches the network
    /// without them.
    pub fn new(config: &PmConfig) -> Result<Self> {
        config.require_credentials()?;
        let client_id = config.client_id.clone().ok_or_else(|| {
            MeridianError::NotConfigured("pm.client_id is not set".to_string())
        })?;
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            MeridianError::NotConfigured("pm.client_secret is not set".to_string())
        })?;

        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MeridianError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            client_id,
            client_secret,
            organization_id: config.organization_id.clone(),
            http,
            token: TokenCache::new(),
            retry: config.retry.clone(),
        })
    }

    /// Base URL of the PM system
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns a valid bearer token, acquiring one when the cache is empty
    /// or near expiry
    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.token.current().await {
            return Ok(token);
        }

        let token = self.acquire_token().await?;
        Ok(token)
    }

    /// Client-credential token acquisition
    async fn acquire_token(&self) -> Result<String> {
        let credentials = format!(
            "{}:{}",
            self.client_id,
            self.client_secret.expose_secret()
        );
        let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());

        let resp = self
            .http
            .post(&self.token_url)
            .header("Authorization", format!("Basic {encoded}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PmApiError::TokenAcquisition(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PmApiError::TokenAcquisition(format!(
                "token endpoint returned {status}: {body}"
            ))
            .into());
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .map_err(|e| PmApiError::TokenAcquisition(format!("invalid token response: {e}")))?;

        tracing::debug!(
            expires_in = token_resp.expires_in,
            "Acquired PM access token"
        );

        self.token
            .store(token_resp.access_token.clone(), token_resp.expires_in)
            .await;

        Ok(token_resp.access_token)
    }

    /// One authenticated GET, classified into the domain error taxonomy
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        match self.get_json_optional(url).await? {
            Some(value) => Ok(value),
            None => Err(PmApiError::api(404, format!("resource not found: {url}")).into()),
        }
    }

    /// Authenticated GET returning `None` on a well-formed 404
    async fn get_json_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let token = self.bearer_token().await?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(&token)
            .header("Accept", "application/fhir+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MeridianError::Pm(PmApiError::Timeout(e.to_string()))
                } else {
                    MeridianError::Pm(PmApiError::ConnectionFailed(e.to_string()))
                }
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED => {
                // Token may have been revoked server-side; drop it so the
                // retry path re-authenticates.
                self.token.clear().await;
                let body = resp.text().await.unwrap_or_default();
                Err(PmApiError::api(401, body).into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unspecified")
                    .to_string();
                Err(PmApiError::RateLimited(retry_after).into())
            }
            status if status.is_success() => {
                let value = resp
                    .json::<T>()
                    .await
                    .map_err(|e| PmApiError::InvalidResponse(e.to_string()))?;
                Ok(Some(value))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(PmApiError::api(status.as_u16(), body).into())
            }
        }
    }

    /// Retry a request with exponential backoff and jitter
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries || !is_retryable(&e) {
                        return Err(e);
                    }

                    let delay_ms = (self.retry.initial_delay_ms as f64
                        * self.retry.backoff_multiplier.powi(attempt as i32 - 1))
                        as u64;
                    let delay_ms = delay_ms.min(self.retry.max_delay_ms);
                    let jitter = rand::thread_rng().gen_range(0..=delay_ms / 4 + 1);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms + jitter,
                        error = %e,
                        "Retrying PM request after error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                }
            }
        }
    }

    /// Fetch a collection, following `next` bundle links until exhausted
    async fn fetch_all_pages<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut resources = Vec::new();
        let mut url = Some(first_url);

        while let Some(current) = url.take() {
            let bundle: Bundle<T> = self
                .retry_request(|| self.get_json::<Bundle<T>>(&current))
                .await?;

            url = bundle.next_link().map(|s| s.to_string());
            resources.extend(bundle.into_resources());
        }

        Ok(resources)
    }

    fn appointments_url(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        format!(
            "{}/Appointment?practitioner=Practitioner/{}&date=ge{}&date=le{}&_count={}",
            self.base_url,
            practitioner_remote_id,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
            PAGE_SIZE
        )
    }
}

/// Whether an error is worth retrying
fn is_retryable(err: &MeridianError) -> bool {
    match err {
        MeridianError::Pm(PmApiError::ConnectionFailed(_)) => true,
        MeridianError::Pm(PmApiError::Timeout(_)) => true,
        MeridianError::Pm(PmApiError::RateLimited(_)) => true,
        // 401 is retryable once the cleared token is re-acquired
        MeridianError::Pm(PmApiError::Api { status, .. }) => *status >= 500 || *status == 401,
        _ => false,
    }
}

#[async_trait]
impl PmApi for FhirPmClient {
    async fn get_practitioner(&self, remote_id: &RemoteId) -> Result<Option<PmPractitioner>> {
        let url = format!("{}/Practitioner/{}", self.base_url, remote_id);
        self.retry_request(|| self.get_json_optional::<PmPractitioner>(&url))
            .await
    }

    async fn get_all_practitioners(&self) -> Result<Vec<PmPractitioner>> {
        let mut url = format!("{}/Practitioner?_count={}", self.base_url, PAGE_SIZE);
        if let Some(org) = &self.organization_id {
            url.push_str(&format!("&organization=Organization/{org}"));
        }
        self.fetch_all_pages(url).await
    }

    async fn get_patient(&self, remote_id: &RemoteId) -> Result<Option<PmPatient>> {
        let url = format!("{}/Patient/{}", self.base_url, remote_id);
        self.retry_request(|| self.get_json_optional::<PmPatient>(&url))
            .await
    }

    async fn get_patients_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
    ) -> Result<Vec<PmPatient>> {
        let url = format!(
            "{}/Patient?general-practitioner=Practitioner/{}&_count={}",
            self.base_url, practitioner_remote_id, PAGE_SIZE
        );
        self.fetch_all_pages(url).await
    }

    async fn get_appointments_by_practitioner(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmAppointment>> {
        let url = self.appointments_url(practitioner_remote_id, start, end);
        self.fetch_all_pages(url).await
    }

    async fn get_appointments_with_patient_details(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmAppointment>> {
        let mut appointments = self
            .get_appointments_by_practitioner(practitioner_remote_id, start, end)
            .await?;

        // Fill in missing patient display names, fetching each referenced
        // patient at most once.
        let mut display_cache: HashMap<String, Option<String>> = HashMap::new();

        for appointment in &mut appointments {
            for participant in &mut appointment.participant {
                let Some(reference) = participant.actor.reference.clone() else {
                    continue;
                };
                if !reference.starts_with("Patient/") || participant.actor.display.is_some() {
                    continue;
                }

                let display = match display_cache.get(&reference) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched = match RemoteId::from_reference(&reference) {
                            Ok(id) => self.get_patient(&id).await?.map(|p| patient_display(&p)),
                            Err(_) => None,
                        };
                        display_cache.insert(reference.clone(), fetched.clone());
                        fetched
                    }
                };

                participant.actor.display = display;
            }
        }

        Ok(appointments)
    }

    async fn get_slots(
        &self,
        practitioner_remote_id: &RemoteId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PmSlot>> {
        let url = format!(
            "{}/Slot?schedule.actor=Practitioner/{}&start=ge{}&start=le{}&_count={}",
            self.base_url,
            practitioner_remote_id,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
            PAGE_SIZE
        );
        self.fetch_all_pages(url).await
    }
}

/// "Given Family" display text for a fetched patient
fn patient_display(patient: &PmPatient) -> String {
    let name = patient.name.first();
    let given = name
        .and_then(|n| n.given.first())
        .map(|s| s.as_str())
        .unwrap_or_default();
    let family = name
        .and_then(|n| n.family.as_deref())
        .unwrap_or_default();
    format!("{given} {family}").trim().to_string()
}
