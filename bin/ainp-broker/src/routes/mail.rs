//! `/api/mail/*`: inbox/thread reads and own-view mutations, all scoped by
//! the caller's DID.
//!
//! The spec leaves authentication of GET requests unspecified beyond "scoped
//! by caller DID"; this broker resolves the caller the same way the push
//! channel does (§6.2) — an explicit `?did=` query parameter — rather than
//! inventing a bearer-token scheme the spec never names.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use ainp_core::constants::{MAILBOX_DEFAULT_PAGE_LIMIT, MAILBOX_MAX_PAGE_LIMIT};
use ainp_core::{ConversationId, Did, MailCursor, MessageId};

use crate::http_error::{AppError, AppResult};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct InboxQuery {
    pub did: String,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn inbox(
    State(state): State<SharedState>,
    Query(q): Query<InboxQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let owner = Did::new(q.did);
    let limit = q
        .limit
        .unwrap_or(MAILBOX_DEFAULT_PAGE_LIMIT)
        .min(MAILBOX_MAX_PAGE_LIMIT);
    let cursor = q.cursor.as_deref().and_then(MailCursor::decode);

    let messages = state
        .router
        .inbox(&owner, cursor.as_ref(), q.label.as_deref(), q.unread_only, limit)
        .map_err(AppError::from)?;

    let next_cursor = messages
        .last()
        .map(|m| MailCursor { timestamp: m.created_at, id: m.id.clone() }.encode());

    Ok(Json(serde_json::json!({
        "messages": messages,
        "next_cursor": next_cursor,
    })))
}

#[derive(Deserialize)]
pub struct ThreadQuery {
    pub did: String,
}

pub async fn thread(
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
    Query(q): Query<ThreadQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let caller = Did::new(q.did);
    let conversation_id = ConversationId::new(conversation_id);
    let messages = state
        .router
        .thread(&caller, &conversation_id)
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "messages": messages })))
}

#[derive(Deserialize)]
pub struct MarkReadBody {
    pub did: String,
    pub created_at: i64,
    pub id: String,
}

pub async fn read(
    State(state): State<SharedState>,
    Json(body): Json<MarkReadBody>,
) -> AppResult<Json<serde_json::Value>> {
    let caller = Did::new(body.did);
    let id = MessageId::new(body.id);
    state
        .router
        .mark_read(&caller, body.created_at, &id)
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Deserialize)]
pub struct LabelBody {
    pub did: String,
    pub created_at: i64,
    pub id: String,
    pub label: String,
}

pub async fn label(
    State(state): State<SharedState>,
    Json(body): Json<LabelBody>,
) -> AppResult<Json<serde_json::Value>> {
    let caller = Did::new(body.did);
    let id = MessageId::new(body.id);
    state
        .router
        .label(&caller, body.created_at, &id, body.label)
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
