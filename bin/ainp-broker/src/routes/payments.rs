//! `/api/payments/*`: issuing a payment challenge and the idempotent
//! webhook boundary that credits the ledger once a provider confirms it was
//! paid (SPEC_FULL.md §10's "supplemented feature").

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use ainp_core::{AinpError, Did, EnvelopeId};

use crate::http_error::{AppError, AppResult};
use crate::state::{now_ms, SharedState};

#[derive(Deserialize)]
pub struct RequestBody {
    pub did: String,
    pub amount_atomic: Option<u64>,
}

/// Always issues a 402 challenge: this endpoint exists to *obtain* payment
/// instructions, not to bypass them.
pub async fn request_challenge(
    State(state): State<SharedState>,
    Json(body): Json<RequestBody>,
) -> AppResult<Json<serde_json::Value>> {
    let _ = Did::new(body.did);
    let request_id = EnvelopeId::generate().as_str().to_string();
    let amount_atomic = body.amount_atomic.unwrap_or(state.config.postage_amount_atomic);
    let now_s = now_ms() / 1000;
    Err(AppError::from(AinpError::PaymentRequired {
        request_id: request_id.clone(),
        amount_atomic,
        payment_url: format!("ainp://pay/{request_id}"),
        expires_at: now_s + state.config.payment_challenge_ttl_seconds,
    }))
}

#[derive(Deserialize)]
pub struct WebhookBody {
    pub request_id: String,
    pub idempotency_key: String,
    pub did: String,
    pub amount_atomic: u64,
}

/// The webhook secret is read once per call rather than cached in
/// `AppState`, matching `BrokerConfig`'s env-var-first posture for anything
/// that looks like a credential.
fn webhook_secret() -> Result<String, AinpError> {
    std::env::var("AINP_PAYMENT_WEBHOOK_SECRET")
        .map_err(|_| AinpError::FeatureDisabled("AINP_PAYMENT_WEBHOOK_SECRET not configured".into()))
}

pub async fn webhook(
    State(state): State<SharedState>,
    Path(provider): Path<String>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let secret = webhook_secret().map_err(AppError::from)?;
    let signature = headers
        .get("X-Ainp-Webhook-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError(AinpError::Unauthorized))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError(AinpError::Internal(e.to_string())))?;
    mac.update(&body);
    let expected = hex::encode(mac.finalize().into_bytes());
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(AppError(AinpError::Unauthorized));
    }

    let payload: WebhookBody =
        serde_json::from_slice(&body).map_err(|e| AppError(AinpError::InvalidRequest(e.to_string())))?;

    let first_sight = state
        .store
        .mark_idempotent(&format!("webhook:{provider}:{}", payload.idempotency_key))
        .map_err(AppError::from)?;
    if !first_sight {
        return Ok(Json(serde_json::json!({ "status": "already_processed" })));
    }

    let did = Did::new(payload.did);
    state.ledger.create_account(&did, 0).map_err(AppError::from)?;
    let account = state
        .ledger
        .deposit(&did, payload.amount_atomic, &format!("payment:{}", payload.request_id), now_ms() / 1000)
        .map_err(AppError::from)?;

    Ok(Json(serde_json::json!({ "status": "ok", "credits": account })))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
