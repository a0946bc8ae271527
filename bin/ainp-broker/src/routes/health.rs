//! Liveness/readiness (supplemented feature, SPEC_FULL.md §10): a
//! per-dependency status map rather than a bare boolean, so an operator can
//! tell which dependency is unhealthy without reading logs.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
struct DependencyStatus {
    name: &'static str,
    ok: bool,
    detail: Option<String>,
}

pub async fn liveness() -> impl IntoResponse {
    Json(serde_json::json!({"status": "alive"}))
}

pub async fn readiness(State(state): State<SharedState>) -> impl IntoResponse {
    let store_status = match state.store.flush() {
        Ok(()) => DependencyStatus {
            name: "store",
            ok: true,
            detail: None,
        },
        Err(e) => DependencyStatus {
            name: "store",
            ok: false,
            detail: Some(e.to_string()),
        },
    };

    let cache_degraded = state.antifraud.is_degraded();
    let cache_status = DependencyStatus {
        name: "antifraud_cache",
        ok: !cache_degraded,
        detail: if cache_degraded {
            Some("operating fail-open after a store error".into())
        } else {
            None
        },
    };

    // The push registry lives entirely in process memory; it has no
    // external dependency to lose touch with.
    let push_status = DependencyStatus {
        name: "push",
        ok: true,
        detail: None,
    };

    let dependencies = vec![store_status, cache_status, push_status];
    let all_ok = dependencies.iter().all(|d| d.ok);
    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(serde_json::json!({ "dependencies": dependencies })))
}
