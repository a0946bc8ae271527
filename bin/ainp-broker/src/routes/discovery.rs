//! `/api/discovery/search`: weighted semantic capability search.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use ainp_discovery::{rank::RankWeights, SearchQuery};

use crate::http_error::{AppError, AppResult};
use crate::state::{now_ms, SharedState};

#[derive(Deserialize)]
pub struct SearchBody {
    pub description: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub min_trust: Option<f64>,
    #[serde(default)]
    pub min_similarity: Option<f64>,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<SharedState>,
    Json(body): Json<SearchBody>,
) -> AppResult<Json<serde_json::Value>> {
    let embedding = body
        .embedding
        .unwrap_or_else(|| state.discovery.embed(&body.description));

    let query = SearchQuery {
        embedding,
        min_similarity: body.min_similarity.unwrap_or(0.0),
        tags: body.tags,
        min_trust: body.min_trust.unwrap_or(0.0),
        limit: body.limit.unwrap_or(20),
    };
    let weights = RankWeights {
        w_sim: state.config.discovery_weights.similarity,
        w_trust: state.config.discovery_weights.trust,
        w_use: state.config.discovery_weights.usefulness,
    };

    let results = state
        .discovery
        .search(&query, weights, now_ms())
        .map_err(AppError::from)?;

    Ok(Json(serde_json::json!({ "results": results.into_iter().map(|r| {
        serde_json::json!({
            "agent_id": r.agent_id.as_str(),
            "capability": r.capability,
            "sim": r.sim,
            "trust": r.trust,
            "usefulness": r.usefulness,
            "rank": r.rank,
        })
    }).collect::<Vec<_>>() })))
}
