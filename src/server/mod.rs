//! HTTP trigger surfaces
//!
//! Thin entry points over the sync engine: a health probe, a status read, a
//! manual sync trigger, and the inbound webhook receiver. All state is
//! injected; handlers hold no logic beyond request/response shaping and
//! signature verification.

use crate::adapters::pm::PmApi;
use crate::adapters::store::SyncStore;
use crate::config::MeridianConfig;
use crate::core::status::StatusReporter;
use crate::core::sync::{SyncEvent, SyncResult, SyncService};
use crate::domain::RemoteId;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::str::FromStr;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SyncService>,
    pub reporter: Arc<StatusReporter>,
    pub pm: Arc<dyn PmApi>,
    pub config: Arc<MeridianConfig>,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sync/status", get(sync_status))
        .route("/v1/sync", post(manual_sync))
        .route("/v1/webhooks/pm", post(webhook))
        .route("/v1/schedule", get(schedule))
        .route("/v1/availability", get(availability))
        .with_state(state)
}

/// Inbound webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: String,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    pub data: serde_json::Value,

    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn healthz(State(state): State<AppState>) -> axum::response::Response {
    match state.service.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    practitioner: String,
}

async fn sync_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> axum::response::Response {
    let Ok(remote_id) = RemoteId::new(query.practitioner) else {
        return error_response(StatusCode::BAD_REQUEST, "practitioner id cannot be empty");
    };

    match state.reporter.get_sync_status(&remote_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ManualSyncRequest {
    /// Sync one practitioner; falls back to the configured bootstrap
    /// practitioner, then to a sweep of all practitioners
    #[serde(default)]
    practitioner: Option<String>,
}

#[derive(Debug, Serialize)]
struct PractitionerOutcome {
    practitioner: String,
    #[serde(flatten)]
    result: SyncResult,
}

#[derive(Debug, Serialize)]
struct SweepResponse {
    results: Vec<PractitionerOutcome>,
}

/// Manual sync trigger
///
/// Returns 200 with per-practitioner results even when some practitioners
/// failed; only a total inability to reach the PM system yields a non-200
/// status.
async fn manual_sync(
    State(state): State<AppState>,
    body: Option<Json<ManualSyncRequest>>,
) -> axum::response::Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let target = request
        .practitioner
        .or_else(|| state.config.pm.practitioner_id.clone());

    let results = match target {
        Some(id) => {
            let Ok(remote_id) = RemoteId::new(id) else {
                return error_response(StatusCode::BAD_REQUEST, "practitioner id cannot be empty");
            };
            let result = state.service.full_sync(&remote_id).await;
            vec![(remote_id, result)]
        }
        None => match state.service.sync_all_practitioners().await {
            Ok(results) => results,
            Err(e) => {
                return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
            }
        },
    };

    let response = SweepResponse {
        results: results
            .into_iter()
            .map(|(remote_id, result)| PractitionerOutcome {
                practitioner: remote_id.into_inner(),
                result,
            })
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Inbound webhook receiver
///
/// Accepts `{event, timestamp, data, signature}`. When a webhook secret is
/// configured the signature must be the HMAC-SHA256 of the canonical JSON
/// serialization of `data`, hex-encoded, optionally prefixed `sha256=`.
async fn webhook(State(state): State<AppState>, body: Bytes) -> axum::response::Response {
    if body.len() > state.config.server.max_payload_bytes {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "payload too large");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid body: {e}")),
    };

    if let Some(secret) = &state.config.server.webhook_secret {
        let data_bytes = match serde_json::to_vec(&payload.data) {
            Ok(bytes) => bytes,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid data: {e}"))
            }
        };
        let Some(signature) = payload.signature.as_deref() else {
            return error_response(StatusCode::UNAUTHORIZED, "missing signature");
        };
        if verify_signature(secret.expose_secret().as_ref(), signature, &data_bytes).is_err() {
            tracing::warn!(event = %payload.event, "Webhook signature verification failed");
            return error_response(StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let event = match SyncEvent::from_str(&payload.event) {
        Ok(event) => event,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    tracing::info!(
        event = %event,
        timestamp = ?payload.timestamp,
        "Webhook received"
    );

    let result = state.service.incremental_sync(event, &payload.data).await;
    (StatusCode::OK, Json(result)).into_response()
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    practitioner: String,

    /// Days ahead to read; defaults to one week
    #[serde(default = "default_window_days")]
    days: i64,
}

fn default_window_days() -> i64 {
    7
}

#[derive(Debug, Serialize)]
struct ScheduleEntry {
    id: String,
    status: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    patient: Option<String>,
}

/// Upcoming appointments with participant display names, read live from
/// the PM system (practitioner day-view)
async fn schedule(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> axum::response::Response {
    let Ok(remote_id) = RemoteId::new(query.practitioner) else {
        return error_response(StatusCode::BAD_REQUEST, "practitioner id cannot be empty");
    };

    let now = Utc::now();
    match state
        .pm
        .get_appointments_with_patient_details(&remote_id, now, now + Duration::days(query.days))
        .await
    {
        Ok(appointments) => {
            let entries: Vec<ScheduleEntry> = appointments
                .into_iter()
                .map(|a| {
                    let patient = a
                        .participant
                        .iter()
                        .filter(|p| {
                            p.actor
                                .reference
                                .as_deref()
                                .map(|r| r.starts_with("Patient/"))
                                .unwrap_or(false)
                        })
                        .find_map(|p| p.actor.display.clone());
                    ScheduleEntry {
                        id: a.id,
                        status: a.status,
                        start: a.start,
                        end: a.end,
                        patient,
                    }
                })
                .collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct AvailabilitySlot {
    id: String,
    status: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

/// Availability slots, read live from the PM system
async fn availability(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> axum::response::Response {
    let Ok(remote_id) = RemoteId::new(query.practitioner) else {
        return error_response(StatusCode::BAD_REQUEST, "practitioner id cannot be empty");
    };

    let now = Utc::now();
    match state
        .pm
        .get_slots(&remote_id, now, now + Duration::days(query.days))
        .await
    {
        Ok(slots) => {
            let entries: Vec<AvailabilitySlot> = slots
                .into_iter()
                .map(|s| AvailabilitySlot {
                    id: s.id,
                    status: s.status,
                    start: s.start,
                    end: s.end,
                })
                .collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// Verify a webhook signature
///
/// Accepts raw hex or `sha256=<hex>`; comparison is constant-time via the
/// `hmac` crate.
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> Result<(), ()> {
    let sig_hex = signature.trim();
    let sig_hex = sig_hex.strip_prefix("sha256=").unwrap_or(sig_hex);
    let provided = hex::decode(sig_hex).map_err(|_| ())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| ())?;
    mac.update(body);
    mac.verify_slice(&provided).map_err(|_| ())
}

/// Compute a webhook signature in `sha256=<hex>` form
///
/// The counterpart of [`verify_signature`]; used by tests and by local
/// tooling that replays events.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let body = br#"{"id":"APT-1"}"#;
        let signature = sign_body("secret", body);
        assert!(verify_signature("secret", &signature, body).is_ok());
    }

    #[test]
    fn test_verify_accepts_raw_hex() {
        let body = b"payload";
        let signature = sign_body("secret", body);
        let raw = signature.strip_prefix("sha256=").unwrap();
        assert!(verify_signature("secret", raw, body).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_body("secret", b"original");
        assert!(verify_signature("secret", &signature, b"tampered").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signature = sign_body("secret", b"payload");
        assert!(verify_signature("other-secret", &signature, b"payload").is_err());
    }

    #[test]
    fn test_malformed_signature_rejected() {
        assert!(verify_signature("secret", "not-hex!", b"payload").is_err());
    }

    #[test]
    fn test_webhook_payload_parses() {
        let json = r#"{
            "event": "appointment.updated",
            "timestamp": "2026-08-06T09:00:00Z",
            "data": {"id": "APT-1", "status": "fulfilled"},
            "signature": "sha256=00"
        }"#;
        let payload: WebhookPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.event, "appointment.updated");
        assert!(payload.signature.is_some());
    }
}
