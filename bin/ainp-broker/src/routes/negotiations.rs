//! `/api/negotiations/*` (§4.7): session creation and the propose/accept/
//! reject/settle state machine.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use ainp_core::{Did, IncentiveSplit, Proposal, SessionId};

use crate::http_error::{AppError, AppResult};
use crate::state::{now_ms, SharedState};

#[derive(Deserialize, Default)]
pub struct ProposalBody {
    pub price: Option<f64>,
    pub delivery_time: Option<f64>,
    pub quality_sla: Option<bool>,
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl From<ProposalBody> for Proposal {
    fn from(p: ProposalBody) -> Self {
        Proposal {
            price: p.price,
            delivery_time: p.delivery_time,
            quality_sla: p.quality_sla,
            custom: p.custom,
        }
    }
}

#[derive(Deserialize)]
pub struct IncentiveSplitBody {
    pub agent: f64,
    pub broker: f64,
    pub validator: f64,
    pub pool: f64,
}

impl From<IncentiveSplitBody> for IncentiveSplit {
    fn from(s: IncentiveSplitBody) -> Self {
        IncentiveSplit {
            agent: s.agent,
            broker: s.broker,
            validator: s.validator,
            pool: s.pool,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateBody {
    pub initiator_did: String,
    pub responder_did: String,
    pub intent_id: Option<String>,
    #[serde(default)]
    pub initial_proposal: ProposalBody,
    pub max_rounds: Option<u32>,
    pub incentive_split: Option<IncentiveSplitBody>,
    pub ttl_ms: Option<i64>,
}

pub async fn create(
    State(state): State<SharedState>,
    Json(body): Json<CreateBody>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .negotiation
        .create_session(
            Did::new(body.initiator_did),
            Did::new(body.responder_did),
            body.intent_id,
            body.initial_proposal.into(),
            body.max_rounds,
            body.incentive_split.map(Into::into),
            body.ttl_ms,
            now_ms(),
        )
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session })))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .negotiation
        .get(&SessionId::new(id))
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session })))
}

#[derive(Deserialize)]
pub struct ProposeBody {
    pub proposer_did: String,
    #[serde(default)]
    pub proposal: ProposalBody,
}

pub async fn propose(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<ProposeBody>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .negotiation
        .propose(
            &SessionId::new(id),
            &Did::new(body.proposer_did),
            body.proposal.into(),
            now_ms(),
        )
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session })))
}

#[derive(Deserialize)]
pub struct AcceptBody {
    pub accepting_did: String,
}

pub async fn accept(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<AcceptBody>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .negotiation
        .accept(&SessionId::new(id), &Did::new(body.accepting_did), now_ms())
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session })))
}

pub async fn reject(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .negotiation
        .reject(&SessionId::new(id), now_ms())
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session })))
}

pub async fn settle(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let (session, receipt) = state
        .negotiation
        .settle(&SessionId::new(id), now_ms())
        .map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "session": session, "receipt": receipt })))
}
