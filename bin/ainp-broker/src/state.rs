//! Shared application state handed to every HTTP/WS handler. Every field is
//! itself a cheap-to-clone handle (sled trees, `Arc`s), so `AppState` is
//! built once at startup and wrapped in a single `Arc` for axum's `State`
//! extractor.

use std::sync::Arc;

use ainp_antifraud::AntiFraudCache;
use ainp_config::BrokerConfig;
use ainp_discovery::DiscoveryIndex;
use ainp_ledger::CreditLedger;
use ainp_negotiation::NegotiationEngine;
use ainp_pipeline::EnvelopePipeline;
use ainp_push::PushRegistry;
use ainp_receipts::ReceiptEngine;
use ainp_reputation::ReputationEngine;
use ainp_routing::Router as MessageRouter;
use ainp_store::StoreDb;

pub struct AppState {
    pub config: BrokerConfig,
    pub store: StoreDb,
    pub ledger: CreditLedger,
    pub discovery: DiscoveryIndex,
    pub antifraud: AntiFraudCache,
    pub pipeline: EnvelopePipeline,
    pub router: MessageRouter,
    pub negotiation: NegotiationEngine,
    pub receipts: ReceiptEngine,
    pub reputation: ReputationEngine,
    pub push: Arc<PushRegistry>,
}

pub type SharedState = Arc<AppState>;

/// Wall-clock milliseconds since epoch, the one place in the HTTP layer that
/// is allowed to call `chrono::Utc::now()` directly.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
