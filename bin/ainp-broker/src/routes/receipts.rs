//! `/api/receipts/*` (§4.8): committee reads, attestation ingest, and an
//! on-demand finalize check (the scheduler's finalizer sweep covers the
//! steady-state case; this lets a client force the check for a single
//! receipt once it knows its committee has posted).

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use ainp_core::{AttestationId, AttestationType, Did, ReceiptId};

use crate::http_error::{AppError, AppResult};
use crate::state::{now_ms, SharedState};

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = ReceiptId::new(id);
    let receipt = state
        .receipts
        .get(&id)
        .map_err(AppError::from)?
        .ok_or_else(|| AppError(ainp_core::AinpError::NotFound(format!("no receipt {}", id.as_str()))))?;
    Ok(Json(serde_json::json!({ "receipt": receipt })))
}

pub async fn committee(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let committee = state
        .receipts
        .committee(&ReceiptId::new(id))
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "committee": committee })))
}

#[derive(Deserialize)]
pub struct AttestBody {
    pub by_did: String,
    #[serde(rename = "type")]
    pub attestation_type: AttestationType,
    pub score: Option<f64>,
    pub confidence: Option<f64>,
    pub evidence_ref: Option<String>,
    pub signature: Option<String>,
}

pub async fn attest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<AttestBody>,
) -> AppResult<Json<serde_json::Value>> {
    let task_id = ReceiptId::new(id);
    let now = now_ms();
    let attestation = ainp_core::Attestation {
        id: AttestationId::generate(),
        task_id,
        by_did: Did::new(body.by_did),
        attestation_type: body.attestation_type,
        score: body.score,
        confidence: body.confidence,
        evidence_ref: body.evidence_ref,
        signature: body.signature,
        created_at: now,
    };
    let inserted = state.receipts.attest(attestation).map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "status": "ok", "inserted": inserted })))
}

pub async fn finalize(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let receipt = state
        .receipts
        .finalize(&ReceiptId::new(id), now_ms())
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "receipt": receipt })))
}
