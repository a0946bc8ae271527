use crate::BrokerConfig;

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Layer environment variables over a set of defaults. Unset or unparseable
/// variables silently keep the default — validation catches anything that
/// ends up contradictory, not the loader.
pub(crate) fn load_from_env(mut cfg: BrokerConfig) -> BrokerConfig {
    let f = &mut cfg.flags;
    f.signature_verification_enabled = env_bool(
        "SIGNATURE_VERIFICATION_ENABLED",
        f.signature_verification_enabled,
    );
    f.replay_check_enabled = env_bool("REPLAY_CHECK_ENABLED", f.replay_check_enabled);
    f.content_dedupe_enabled = env_bool("CONTENT_DEDUPE_ENABLED", f.content_dedupe_enabled);
    f.greylist_enabled = env_bool("GREYLIST_ENABLED", f.greylist_enabled);
    f.postage_enabled = env_bool("POSTAGE_ENABLED", f.postage_enabled);
    f.credit_ledger_enabled = env_bool("CREDIT_LEDGER_ENABLED", f.credit_ledger_enabled);
    f.usefulness_aggregation_enabled = env_bool(
        "USEFULNESS_AGGREGATION_ENABLED",
        f.usefulness_aggregation_enabled,
    );
    f.usefulness_weighted_discovery_enabled = env_bool(
        "USEFULNESS_WEIGHTED_DISCOVERY_ENABLED",
        f.usefulness_weighted_discovery_enabled,
    );
    f.negotiation_enabled = env_bool("NEGOTIATION_ENABLED", f.negotiation_enabled);
    f.finalizer_enabled = env_bool("FINALIZER_ENABLED", f.finalizer_enabled);
    f.tracing_enabled = env_bool("TRACING_ENABLED", f.tracing_enabled);
    f.monitoring_enabled = env_bool("MONITORING_ENABLED", f.monitoring_enabled);

    cfg.discovery_weights.similarity = env_parse(
        "DISCOVERY_SIMILARITY_WEIGHT",
        cfg.discovery_weights.similarity,
    );
    cfg.discovery_weights.trust =
        env_parse("DISCOVERY_TRUST_WEIGHT", cfg.discovery_weights.trust);
    cfg.discovery_weights.usefulness = env_parse(
        "DISCOVERY_USEFULNESS_WEIGHT",
        cfg.discovery_weights.usefulness,
    );

    cfg.dedupe_ttl_seconds = env_parse("DEDUPE_TTL_SECONDS", cfg.dedupe_ttl_seconds);
    cfg.greylist_delay_seconds = env_parse("GREYLIST_DELAY_SECONDS", cfg.greylist_delay_seconds);
    cfg.postage_amount_atomic = env_parse("POSTAGE_AMOUNT_ATOMIC", cfg.postage_amount_atomic);
    cfg.payment_challenge_ttl_seconds = env_parse(
        "PAYMENT_CHALLENGE_TTL_SECONDS",
        cfg.payment_challenge_ttl_seconds,
    );

    cfg.pou_k = env_parse("POU_K", cfg.pou_k);
    cfg.pou_m = env_parse("POU_M", cfg.pou_m);
    cfg.pou_finalizer_interval_seconds = env_parse(
        "POU_FINALIZER_INTERVAL_SECONDS",
        cfg.pou_finalizer_interval_seconds,
    );

    cfg.reputation_alpha = env_parse("REPUTATION_ALPHA", cfg.reputation_alpha);
    cfg.rate_limit_max_per_minute =
        env_parse("RATE_LIMIT_MAX_PER_MINUTE", cfg.rate_limit_max_per_minute);
    cfg.embedding_dim = env_parse("EMBEDDING_DIM", cfg.embedding_dim);
    cfg.max_rounds = env_parse("MAX_ROUNDS", cfg.max_rounds);
    cfg.display_unit_scale = env_parse("DISPLAY_UNIT_SCALE", cfg.display_unit_scale);

    if let Ok(dir) = std::env::var("AINP_DATA_DIR") {
        cfg.data_dir = std::path::PathBuf::from(dir);
    }
    if let Ok(addr) = std::env::var("AINP_HTTP_ADDR") {
        if let Ok(parsed) = addr.parse() {
            cfg.http_addr = parsed;
        }
    }

    cfg
}
