use serde::{Deserialize, Serialize};

use crate::types::Did;

/// Multi-dimensional EWMA reputation vector: Quality, Timeliness,
/// Reliability, Safety, truth-Value, Impact, Efficiency — all in [0,1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReputation {
    pub agent_did: Did,
    pub q: f64,
    pub t: f64,
    pub r: f64,
    pub s: f64,
    pub v: f64,
    pub i: f64,
    pub e: f64,
    pub updated_at: i64,
}

impl AgentReputation {
    /// A freshly-seen agent starts at the neutral midpoint on every
    /// dimension so the first EWMA update is not unduly swayed by priors.
    pub fn neutral(agent_did: Did, now: i64) -> Self {
        AgentReputation {
            agent_did,
            q: 0.5,
            t: 0.5,
            r: 0.5,
            s: 0.5,
            v: 0.5,
            i: 0.5,
            e: 0.5,
            updated_at: now,
        }
    }

    /// Aggregate trust score derived from the reputation vector, used by
    /// discovery ranking. A simple unweighted mean keeps this independent of
    /// the usefulness blend's own tunable weights.
    pub fn aggregate_trust(&self) -> f64 {
        (self.q + self.t + self.r + self.s + self.v + self.i + self.e) / 7.0
    }
}

/// `new = (1-alpha)*old + alpha*observed`.
pub fn ewma_update(old: f64, observed: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * old + alpha * observed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_moves_toward_observed() {
        let updated = ewma_update(0.5, 1.0, 0.2);
        assert!((updated - 0.6).abs() < 1e-9);
    }

    #[test]
    fn ewma_alpha_one_takes_observed_fully() {
        let updated = ewma_update(0.1, 0.9, 1.0);
        assert!((updated - 0.9).abs() < 1e-9);
    }
}
