use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("discovery weights must sum to 1 (+/- {tolerance}), got {sum}")]
    DiscoveryWeightsInvalid { sum: f64, tolerance: f64 },

    #[error("incentive split must sum to 1 (+/- {tolerance}), got {sum}")]
    IncentiveSplitInvalid { sum: f64, tolerance: f64 },

    #[error("reputation alpha must be in (0,1], got {0}")]
    ReputationAlphaInvalid(f64),

    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: i64 },

    #[error("{field} must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("invalid value for {var}: {source}")]
    InvalidEnvVar {
        var: &'static str,
        source: String,
    },
}
