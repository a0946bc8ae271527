use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{CapabilityId, Did};

/// An agent registered with the broker.
///
/// Identity is self-certifying: `public_key` MUST be derived from `did`,
/// never trusted from a client-supplied field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub did: Did,
    pub public_key: Vec<u8>,
    pub first_seen: i64,
    pub last_seen: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Agent {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map(|e| e <= now).unwrap_or(false)
    }
}

/// An advertised capability of an agent: a natural-language description
/// plus its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: CapabilityId,
    pub agent_id: Did,
    pub description: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub evidence_ref: Option<String>,
}

/// Per-agent trust vector, one-to-one with `Agent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustVector {
    pub agent_id: Did,
    /// Aggregate score in [0,1].
    pub score: f64,
    pub reliability: f64,
    pub honesty: f64,
    pub competence: f64,
    pub timeliness: f64,
    /// Decay rate applied by periodic maintenance, in (0,1].
    pub decay_rate: f64,
    pub last_updated: i64,
}

impl Default for TrustVector {
    fn default() -> Self {
        TrustVector {
            agent_id: Did::new(""),
            score: 0.5,
            reliability: 0.5,
            honesty: 0.5,
            competence: 0.5,
            timeliness: 0.5,
            decay_rate: 0.01,
            last_updated: 0,
        }
    }
}

/// Materialized usefulness score, recomputed by the aggregator job (C9) from
/// finalized receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsefulnessScore {
    pub agent_id: Did,
    /// In [0,100].
    pub usefulness_score: f64,
    pub last_updated: i64,
}
