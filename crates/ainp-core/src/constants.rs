//! ─── Protocol constants and tunable defaults ───────────────────────────────
//!
//! Values here are the defaults referenced throughout the component design;
//! all of them are overridable via `ainp-config::BrokerConfig`.

// ── Anti-fraud (C4) ──────────────────────────────────────────────────────────

/// Replay suppression window, in seconds.
pub const REPLAY_TTL_SECONDS: u64 = 300;

/// Default content-dedupe TTL, in seconds (24h).
pub const DEDUPE_TTL_SECONDS: u64 = 86_400;

/// Delay before a greylisted first-contact retry is allowed, in seconds.
pub const GREYLIST_DELAY_SECONDS: u64 = 60;

/// Postage cost (atomic credit units) charged on first-contact direct sends.
pub const POSTAGE_AMOUNT_ATOMIC: u64 = 1_000;

/// How long a payment challenge issued for unpaid postage stays valid, in
/// seconds, before the caller must request a fresh one.
pub const PAYMENT_CHALLENGE_TTL_SECONDS: i64 = 3_600;

// ── Envelope pipeline (C5) ───────────────────────────────────────────────────

/// Clock skew tolerance for envelope freshness checks, in seconds.
pub const FRESHNESS_SKEW_SECONDS: i64 = 300;

/// Default rate limit, requests per minute, per DID or IP.
pub const RATE_LIMIT_MAX_PER_MINUTE: u32 = 60;

/// Fixed embedding dimension, network-wide.
pub const EMBEDDING_DIM: usize = 1536;

/// Protocol envelope version this broker understands.
pub const ENVELOPE_VERSION: u32 = 1;

// ── Discovery (C3) ───────────────────────────────────────────────────────────

pub const DISCOVERY_SIMILARITY_WEIGHT_DEFAULT: f64 = 0.6;
pub const DISCOVERY_TRUST_WEIGHT_DEFAULT: f64 = 0.3;
pub const DISCOVERY_USEFULNESS_WEIGHT_DEFAULT: f64 = 0.1;

/// Acceptable slop when validating that discovery weights sum to 1.
pub const DISCOVERY_WEIGHT_TOLERANCE: f64 = 1e-3;

/// Default agent advertisement TTL, in milliseconds (1h).
pub const DEFAULT_AGENT_TTL_MS: i64 = 3_600_000;

// ── Routing (C6) ─────────────────────────────────────────────────────────────

/// Default fan-out width for discovery-assisted routing.
pub const DEFAULT_FANOUT_TOP_K: usize = 3;

// ── Negotiation (C7) ─────────────────────────────────────────────────────────

pub const MAX_ROUNDS_DEFAULT: u32 = 10;
pub const MAX_ROUNDS_HARD_CAP: u32 = 20;

/// Epsilon used in convergence-score denominator to avoid division by zero.
pub const CONVERGENCE_EPSILON: f64 = 1e-9;

pub const INCENTIVE_SPLIT_AGENT_DEFAULT: f64 = 0.70;
pub const INCENTIVE_SPLIT_BROKER_DEFAULT: f64 = 0.10;
pub const INCENTIVE_SPLIT_VALIDATOR_DEFAULT: f64 = 0.10;
pub const INCENTIVE_SPLIT_POOL_DEFAULT: f64 = 0.10;

/// Acceptable slop when validating that the incentive split sums to 1.
pub const INCENTIVE_SPLIT_TOLERANCE: f64 = 1e-4;

/// Display-unit to atomic-unit conversion ratio. A `Proposal.price` of `90`
/// is 90 display units, i.e. `90 * DISPLAY_UNIT_SCALE_DEFAULT` atomic units.
pub const DISPLAY_UNIT_SCALE_DEFAULT: u64 = 1000;

// ── Receipts & committee (C8) ────────────────────────────────────────────────

pub const POU_K_DEFAULT: usize = 3;
pub const POU_M_DEFAULT: usize = 5;

// ── Reputation (C9) ──────────────────────────────────────────────────────────

/// EWMA smoothing factor for reputation updates.
pub const REPUTATION_ALPHA_DEFAULT: f64 = 0.2;

/// Reference latency used to normalize timeliness, in milliseconds.
pub const TIMELINESS_L_REF_MS: f64 = 5_000.0;

pub const USEFULNESS_WEIGHT_COMPUTE_DEFAULT: f64 = 0.4;
pub const USEFULNESS_WEIGHT_MEMORY_DEFAULT: f64 = 0.3;
pub const USEFULNESS_WEIGHT_ROUTING_DEFAULT: f64 = 0.2;
pub const USEFULNESS_WEIGHT_VALIDATION_DEFAULT: f64 = 0.1;
pub const USEFULNESS_WEIGHT_LEARNING_DEFAULT: f64 = 0.5;

// ── Push delivery (C10) ──────────────────────────────────────────────────────

/// Bounded per-DID push queue depth; overflow drops oldest-first.
pub const PUSH_QUEUE_DEPTH_DEFAULT: usize = 1000;

// ── Scheduler (C11) ──────────────────────────────────────────────────────────

pub const FINALIZER_INTERVAL_SECONDS: u64 = 60;
pub const FINALIZER_BATCH_SIZE: usize = 100;
pub const USEFULNESS_AGGREGATOR_INTERVAL_SECONDS: u64 = 3_600;
pub const EXPIRY_SWEEP_INTERVAL_SECONDS: u64 = 60;
pub const MAILBOX_DISTILLER_INTERVAL_SECONDS: u64 = 300;

// ── Mailbox pagination ───────────────────────────────────────────────────────

pub const MAILBOX_DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAILBOX_MAX_PAGE_LIMIT: usize = 200;
