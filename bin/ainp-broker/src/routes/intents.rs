//! `/api/intents/send`: the one entry point into the envelope pipeline
//! (§4.5) and, for persistent intents, routing.

use axum::extract::{ConnectInfo, State};
use axum::Json;
use std::net::SocketAddr;

use ainp_core::Envelope;

use crate::http_error::{AppError, AppResult};
use crate::state::SharedState;

pub async fn send(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(envelope): Json<Envelope>,
) -> AppResult<Json<serde_json::Value>> {
    let now = envelope.timestamp_ms.max(crate::state::now_ms());
    let caller_ip = addr.ip().to_string();
    let outcome = state
        .pipeline
        .process(&envelope, Some(&caller_ip), now)
        .map_err(AppError::from)?;

    if let Some(intent) = &outcome.intent {
        state
            .router
            .route(
                &envelope.from_did,
                envelope.to_did.as_ref(),
                envelope.id.as_str(),
                intent,
                now,
            )
            .map_err(AppError::from)?;
    }

    Ok(Json(serde_json::json!({ "status": "routed" })))
}
