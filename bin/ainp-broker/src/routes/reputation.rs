//! `/api/reputation/{did}` (§4.8): the current multi-dimensional reputation
//! vector, or the neutral midpoint for an agent never yet observed.

use axum::extract::{Path, State};
use axum::Json;

use ainp_core::{AgentReputation, Did};

use crate::http_error::AppResult;
use crate::state::{now_ms, SharedState};

pub async fn get(
    State(state): State<SharedState>,
    Path(did): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let did = Did::new(did);
    let reputation = state
        .store
        .get_reputation(&did)
        .map_err(crate::http_error::AppError::from)?
        .unwrap_or_else(|| AgentReputation::neutral(did, now_ms()));
    Ok(Json(serde_json::json!({ "reputation": reputation })))
}
