//! `/api/agents/*`: registration is the one place a caller claims a DID —
//! every other endpoint trusts the DID it's handed and lets signature
//! verification (for writes) or the caller's own honesty (for reads) stand
//! behind it.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use ainp_core::constants::DEFAULT_AGENT_TTL_MS;
use ainp_core::Did;
use ainp_discovery::CapabilityInput;

use crate::http_error::{AppError, AppResult};
use crate::state::{now_ms, SharedState};

#[derive(Deserialize)]
pub struct CapabilityBody {
    pub description: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub did: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityBody>,
    pub ttl_ms: Option<i64>,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(body): Json<RegisterBody>,
) -> AppResult<Json<serde_json::Value>> {
    // A DID is self-certifying: registering one proves nothing more than
    // that it decodes to a valid ed25519 point. Proof of possession of the
    // matching secret key is established per-request by envelope signatures,
    // not at registration time.
    let public_key = ainp_crypto::public_key_of(&body.did)
        .map_err(ainp_core::AinpError::from)
        .map_err(AppError::from)?
        .to_bytes()
        .to_vec();
    let did = Did::new(body.did);
    let now = now_ms();
    let ttl_ms = body.ttl_ms.unwrap_or(DEFAULT_AGENT_TTL_MS);

    let capabilities = body
        .capabilities
        .into_iter()
        .map(|c| CapabilityInput {
            description: c.description,
            embedding: c.embedding,
            tags: c.tags,
        })
        .collect();

    let agent = state
        .discovery
        .advertise(&did, public_key, capabilities, ttl_ms, now)
        .map_err(AppError::from)?;
    let account = state
        .ledger
        .create_account(&did, 0)
        .map_err(AppError::from)?;

    Ok(Json(serde_json::json!({
        "agent": { "did": agent.did.as_str() },
        "credits": account,
    })))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(did): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let did = Did::new(did);
    let agent = state
        .store
        .get_agent(&did)
        .map_err(AppError::from)?
        .ok_or_else(|| AppError(ainp_core::AinpError::NotFound(format!("no agent {}", did.as_str()))))?;
    Ok(Json(serde_json::json!({ "agent": agent })))
}
