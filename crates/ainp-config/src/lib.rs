//! Typed, validated broker configuration (the HTTP surface's §6.3 "envelope
//! of effects"): feature toggles plus scalars, loaded from the environment
//! and validated once at startup so a misconfigured broker never serves a
//! single request.

use ainp_core::constants::*;

mod error;
mod load;
mod validate;

pub use error::ConfigError;

/// Feature toggles. All default to enabled except where noted.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub signature_verification_enabled: bool,
    pub replay_check_enabled: bool,
    pub content_dedupe_enabled: bool,
    pub greylist_enabled: bool,
    pub postage_enabled: bool,
    pub credit_ledger_enabled: bool,
    pub usefulness_aggregation_enabled: bool,
    pub usefulness_weighted_discovery_enabled: bool,
    pub negotiation_enabled: bool,
    pub finalizer_enabled: bool,
    pub tracing_enabled: bool,
    pub monitoring_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            signature_verification_enabled: true,
            replay_check_enabled: true,
            content_dedupe_enabled: true,
            greylist_enabled: true,
            postage_enabled: true,
            credit_ledger_enabled: true,
            usefulness_aggregation_enabled: true,
            usefulness_weighted_discovery_enabled: true,
            negotiation_enabled: true,
            finalizer_enabled: true,
            tracing_enabled: true,
            monitoring_enabled: false,
        }
    }
}

/// Discovery ranking weights; MUST sum to 1 within `DISCOVERY_WEIGHT_TOLERANCE`.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryWeights {
    pub similarity: f64,
    pub trust: f64,
    pub usefulness: f64,
}

impl Default for DiscoveryWeights {
    fn default() -> Self {
        DiscoveryWeights {
            similarity: DISCOVERY_SIMILARITY_WEIGHT_DEFAULT,
            trust: DISCOVERY_TRUST_WEIGHT_DEFAULT,
            usefulness: DISCOVERY_USEFULNESS_WEIGHT_DEFAULT,
        }
    }
}

/// Incentive split applied at negotiation settlement; MUST sum to 1 within
/// `INCENTIVE_SPLIT_TOLERANCE`.
#[derive(Debug, Clone, Copy)]
pub struct IncentiveSplitConfig {
    pub agent: f64,
    pub broker: f64,
    pub validator: f64,
    pub pool: f64,
}

impl Default for IncentiveSplitConfig {
    fn default() -> Self {
        IncentiveSplitConfig {
            agent: INCENTIVE_SPLIT_AGENT_DEFAULT,
            broker: INCENTIVE_SPLIT_BROKER_DEFAULT,
            validator: INCENTIVE_SPLIT_VALIDATOR_DEFAULT,
            pool: INCENTIVE_SPLIT_POOL_DEFAULT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub flags: FeatureFlags,
    pub discovery_weights: DiscoveryWeights,
    pub incentive_split: IncentiveSplitConfig,

    pub dedupe_ttl_seconds: u64,
    pub greylist_delay_seconds: u64,
    pub postage_amount_atomic: u64,
    pub payment_challenge_ttl_seconds: i64,

    pub pou_k: usize,
    pub pou_m: usize,
    pub pou_finalizer_interval_seconds: u64,

    pub reputation_alpha: f64,

    pub rate_limit_max_per_minute: u32,
    pub embedding_dim: usize,

    pub max_rounds: u32,

    /// Atomic units per display unit; `Proposal.price` is in display units,
    /// converted to atomic units at negotiation accept/settle time.
    pub display_unit_scale: u64,

    /// Ledger DIDs credited with the broker/validator/pool shares of a
    /// negotiation settlement's incentive split.
    pub broker_settlement_did: ainp_core::Did,
    pub validator_settlement_did: ainp_core::Did,
    pub pool_settlement_did: ainp_core::Did,

    pub data_dir: std::path::PathBuf,
    pub http_addr: std::net::SocketAddr,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            flags: FeatureFlags::default(),
            discovery_weights: DiscoveryWeights::default(),
            incentive_split: IncentiveSplitConfig::default(),
            dedupe_ttl_seconds: DEDUPE_TTL_SECONDS,
            greylist_delay_seconds: GREYLIST_DELAY_SECONDS,
            postage_amount_atomic: POSTAGE_AMOUNT_ATOMIC,
            payment_challenge_ttl_seconds: PAYMENT_CHALLENGE_TTL_SECONDS,
            pou_k: POU_K_DEFAULT,
            pou_m: POU_M_DEFAULT,
            pou_finalizer_interval_seconds: FINALIZER_INTERVAL_SECONDS,
            reputation_alpha: REPUTATION_ALPHA_DEFAULT,
            rate_limit_max_per_minute: RATE_LIMIT_MAX_PER_MINUTE,
            embedding_dim: EMBEDDING_DIM,
            max_rounds: MAX_ROUNDS_DEFAULT,
            display_unit_scale: DISPLAY_UNIT_SCALE_DEFAULT,
            broker_settlement_did: ainp_core::Did::new("did:key:zAinpBrokerSettlement"),
            validator_settlement_did: ainp_core::Did::new("did:key:zAinpValidatorSettlement"),
            pool_settlement_did: ainp_core::Did::new("did:key:zAinpPoolSettlement"),
            data_dir: std::path::PathBuf::from("~/.ainp/data"),
            http_addr: "127.0.0.1:8080".parse().unwrap(),
        }
    }
}

impl BrokerConfig {
    /// Load configuration from environment variables layered over defaults,
    /// then validate. Fails startup on any contradiction.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = load::load_from_env(BrokerConfig::default());
        validate::validate(&cfg)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate::validate(self)
    }
}
