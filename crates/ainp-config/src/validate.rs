use ainp_core::constants::{
    DISCOVERY_WEIGHT_TOLERANCE, INCENTIVE_SPLIT_TOLERANCE, MAX_ROUNDS_HARD_CAP,
};

use crate::{BrokerConfig, ConfigError};

pub(crate) fn validate(cfg: &BrokerConfig) -> Result<(), ConfigError> {
    let w = &cfg.discovery_weights;
    let weight_sum = w.similarity + w.trust + w.usefulness;
    if (weight_sum - 1.0).abs() > DISCOVERY_WEIGHT_TOLERANCE {
        return Err(ConfigError::DiscoveryWeightsInvalid {
            sum: weight_sum,
            tolerance: DISCOVERY_WEIGHT_TOLERANCE,
        });
    }

    let s = &cfg.incentive_split;
    let split_sum = s.agent + s.broker + s.validator + s.pool;
    if (split_sum - 1.0).abs() > INCENTIVE_SPLIT_TOLERANCE {
        return Err(ConfigError::IncentiveSplitInvalid {
            sum: split_sum,
            tolerance: INCENTIVE_SPLIT_TOLERANCE,
        });
    }

    if !(cfg.reputation_alpha > 0.0 && cfg.reputation_alpha <= 1.0) {
        return Err(ConfigError::ReputationAlphaInvalid(cfg.reputation_alpha));
    }

    if cfg.pou_k == 0 {
        return Err(ConfigError::NonPositive {
            field: "POU_K",
            value: cfg.pou_k as i64,
        });
    }
    if cfg.pou_m < cfg.pou_k {
        return Err(ConfigError::NonPositive {
            field: "POU_M (must be >= POU_K)",
            value: cfg.pou_m as i64,
        });
    }

    if cfg.embedding_dim == 0 {
        return Err(ConfigError::NonPositive {
            field: "EMBEDDING_DIM",
            value: cfg.embedding_dim as i64,
        });
    }

    if cfg.max_rounds == 0 || cfg.max_rounds > MAX_ROUNDS_HARD_CAP {
        return Err(ConfigError::NonPositive {
            field: "MAX_ROUNDS (must be in 1..=MAX_ROUNDS_HARD_CAP)",
            value: cfg.max_rounds as i64,
        });
    }

    if cfg.display_unit_scale == 0 {
        return Err(ConfigError::NonPositive {
            field: "DISPLAY_UNIT_SCALE",
            value: cfg.display_unit_scale as i64,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&BrokerConfig::default()).is_ok());
    }

    #[test]
    fn mis_summing_discovery_weights_is_rejected() {
        let mut cfg = BrokerConfig::default();
        cfg.discovery_weights.similarity = 0.9;
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::DiscoveryWeightsInvalid { .. })
        ));
    }

    #[test]
    fn mis_summing_incentive_split_is_rejected() {
        let mut cfg = BrokerConfig::default();
        cfg.incentive_split.agent = 0.5;
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::IncentiveSplitInvalid { .. })
        ));
    }

    #[test]
    fn zero_alpha_is_rejected() {
        let mut cfg = BrokerConfig::default();
        cfg.reputation_alpha = 0.0;
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::ReputationAlphaInvalid(_))
        ));
    }

    #[test]
    fn pou_m_less_than_k_is_rejected() {
        let mut cfg = BrokerConfig::default();
        cfg.pou_k = 5;
        cfg.pou_m = 3;
        assert!(validate(&cfg).is_err());
    }
}
