use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use ainp_antifraud::AntiFraudCache;
use ainp_config::BrokerConfig;
use ainp_discovery::DiscoveryIndex;
use ainp_ledger::CreditLedger;
use ainp_negotiation::{NegotiationConfig, NegotiationEngine};
use ainp_pipeline::EnvelopePipeline;
use ainp_push::PushRegistry;
use ainp_receipts::ReceiptEngine;
use ainp_reputation::ReputationEngine;
use ainp_routing::Router as MessageRouter;
use ainp_scheduler::{Scheduler, SchedulerConfig, WallClock};
use ainp_store::StoreDb;

mod http_error;
mod routes;
mod state;

use state::AppState;

/// Command-line overrides for a broker that is otherwise configured
/// entirely from the environment (`BrokerConfig::from_env`) — a long-running
/// service gets its per-instance tuning from its deployment environment, not
/// from flags passed at every restart.
#[derive(Parser, Debug)]
#[command(name = "ainp-broker", version, about = "Agent-to-agent messaging broker")]
struct Args {
    /// Overrides AINP_DATA_DIR / the built-in default.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Overrides AINP_HTTP_ADDR / the built-in default.
    #[arg(long)]
    http_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ainp=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("ainp-broker starting");

    let mut config = BrokerConfig::from_env()?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(http_addr) = args.http_addr {
        config.http_addr = http_addr;
    }
    config.validate()?;

    let data_dir = expand_tilde(&config.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    info!(data_dir = %data_dir.display(), "opening store");
    let store = StoreDb::open(&data_dir)?;

    let antifraud = AntiFraudCache::new(store.clone());
    let ledger = CreditLedger::new(store.clone());
    let discovery = DiscoveryIndex::new(store.clone());
    let push = Arc::new(PushRegistry::new(ainp_core::constants::PUSH_QUEUE_DEPTH_DEFAULT));
    let router = MessageRouter::new(store.clone(), discovery.clone(), push.clone());
    let reputation = ReputationEngine::new(store.clone(), config.reputation_alpha);
    let receipts = ReceiptEngine::new(store.clone(), reputation.clone());
    let pipeline = EnvelopePipeline::new(antifraud.clone(), ledger.clone(), store.clone(), config.clone());

    let negotiation_config = NegotiationConfig {
        max_rounds_default: config.max_rounds,
        display_unit_scale: config.display_unit_scale,
        broker_did: config.broker_settlement_did.clone(),
        validator_did: config.validator_settlement_did.clone(),
        pool_did: config.pool_settlement_did.clone(),
        incentive_split: ainp_core::IncentiveSplit {
            agent: config.incentive_split.agent,
            broker: config.incentive_split.broker,
            validator: config.incentive_split.validator,
            pool: config.incentive_split.pool,
        },
        ..NegotiationConfig::new(
            config.broker_settlement_did.clone(),
            config.validator_settlement_did.clone(),
            config.pool_settlement_did.clone(),
        )
    };
    let negotiation = NegotiationEngine::new(
        store.clone(),
        ledger.clone(),
        receipts.clone(),
        reputation.clone(),
        negotiation_config,
    );

    // The settlement counterparties must have ledger accounts before the
    // first `earn` call lands, same as any other agent.
    for did in [
        &config.broker_settlement_did,
        &config.validator_settlement_did,
        &config.pool_settlement_did,
    ] {
        ledger.create_account(did, 0)?;
    }

    let scheduler_config = SchedulerConfig {
        finalizer_enabled: config.flags.finalizer_enabled,
        finalizer_batch_size: ainp_core::constants::FINALIZER_BATCH_SIZE,
        finalizer_interval: Duration::from_secs(config.pou_finalizer_interval_seconds),
        usefulness_aggregator_enabled: config.flags.usefulness_aggregation_enabled,
        usefulness_aggregator_interval: Duration::from_secs(
            ainp_core::constants::USEFULNESS_AGGREGATOR_INTERVAL_SECONDS,
        ),
        expiry_sweep_enabled: true,
        expiry_sweep_interval: Duration::from_secs(ainp_core::constants::EXPIRY_SWEEP_INTERVAL_SECONDS),
        mailbox_distiller_enabled: false,
        mailbox_distiller_interval: Duration::from_secs(
            ainp_core::constants::MAILBOX_DISTILLER_INTERVAL_SECONDS,
        ),
    };
    let scheduler = Scheduler::new(
        scheduler_config,
        Arc::new(receipts.clone()),
        Arc::new(reputation.clone()),
        Arc::new(discovery.clone()),
        Arc::new(negotiation.clone()),
        Arc::new(WallClock),
    );
    let scheduler_handle = scheduler.spawn();

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
        ledger,
        discovery,
        antifraud,
        pipeline,
        router,
        negotiation,
        receipts,
        reputation,
        push,
    });

    let app = routes::build(app_state);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "ainp-broker listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler_handle.abort_all();
    info!("ainp-broker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

/// `~` expansion for `data_dir`, same helper `chronx-node` carries for its
/// own `--data-dir` flag.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(stripped)
    } else {
        path.to_path_buf()
    }
}
