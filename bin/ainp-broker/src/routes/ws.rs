//! `/ws` (§6.2): the bidirectional push channel, keyed by `?did=`. Pushes
//! routed mailbox items as `NOTIFICATION` envelopes; accepts signed
//! envelopes from the client into the same pipeline the HTTP surface uses.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use ainp_core::{Did, Envelope};

use crate::state::{now_ms, SharedState};

#[derive(Deserialize)]
pub struct WsQuery {
    pub did: String,
}

pub async fn handler(
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let did = Did::new(q.did);
    ws.on_upgrade(move |socket| handle_socket(socket, did, state))
}

async fn handle_socket(mut socket: WebSocket, did: Did, state: SharedState) {
    let mut rx = state.push.subscribe(&did);

    loop {
        tokio::select! {
            push = rx.recv() => {
                match push {
                    Ok(notification) => {
                        let payload = serde_json::json!({
                            "@type": "NOTIFICATION",
                            "message": notification.message.as_ref(),
                        });
                        if socket.send(WsMessage::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // A lagging subscriber just missed some notifications;
                    // the mailbox itself is still the durable source of truth.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_envelope(&mut socket, &state, &text).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.push.prune_idle(&did);
}

async fn handle_client_envelope(socket: &mut WebSocket, state: &SharedState, text: &str) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            let _ = socket
                .send(WsMessage::Text(
                    serde_json::json!({"@type": "ERROR", "kind": "INVALID_ENVELOPE", "message": e.to_string()})
                        .to_string(),
                ))
                .await;
            return;
        }
    };

    let now = now_ms();
    match state.pipeline.process(&envelope, None, now) {
        Ok(outcome) => {
            if let Some(intent) = &outcome.intent {
                let _ = state.router.route(
                    &envelope.from_did,
                    envelope.to_did.as_ref(),
                    envelope.id.as_str(),
                    intent,
                    now,
                );
            }
        }
        Err(e) => {
            let _ = socket
                .send(WsMessage::Text(
                    serde_json::json!({"@type": "ERROR", "kind": e.kind().as_str(), "message": e.to_string()})
                        .to_string(),
                ))
                .await;
        }
    }
}
