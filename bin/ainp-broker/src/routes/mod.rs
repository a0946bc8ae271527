pub mod agents;
pub mod discovery;
pub mod health;
pub mod intents;
pub mod mail;
pub mod negotiations;
pub mod payments;
pub mod receipts;
pub mod reputation;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Builds the full `/api` surface plus `/health` and `/ws`, wrapping the
/// transport with a `tower::ServiceBuilder` stack the same way
/// `chronx_rpc::RpcServer::start` layers CORS onto its jsonrpsee server.
pub fn build(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/agents/register", post(agents::register))
        .route("/api/agents/:did", get(agents::get))
        .route("/api/discovery/search", post(discovery::search))
        .route("/api/intents/send", post(intents::send))
        .route("/api/mail/inbox", get(mail::inbox))
        .route("/api/mail/threads/:conversation_id", get(mail::thread))
        .route("/api/mail/read", post(mail::read))
        .route("/api/mail/label", post(mail::label))
        .route("/api/negotiations", post(negotiations::create))
        .route("/api/negotiations/:id", get(negotiations::get))
        .route("/api/negotiations/:id/propose", post(negotiations::propose))
        .route("/api/negotiations/:id/accept", post(negotiations::accept))
        .route("/api/negotiations/:id/reject", post(negotiations::reject))
        .route("/api/negotiations/:id/settle", post(negotiations::settle))
        .route("/api/reputation/:did", get(reputation::get))
        .route("/api/receipts/:id", get(receipts::get))
        .route("/api/receipts/:id/attestations", post(receipts::attest))
        .route("/api/receipts/:id/committee", get(receipts::committee))
        .route("/api/receipts/:id/finalize", post(receipts::finalize))
        .route("/api/payments/requests", post(payments::request_challenge))
        .route("/api/payments/webhooks/:provider", post(payments::webhook))
        .route("/ws", get(ws::handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_methods(Any)
                        .allow_origin(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
