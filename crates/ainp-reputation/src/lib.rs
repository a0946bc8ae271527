//! Reputation (C9): multi-dimensional EWMA vector derived from finalized
//! receipts, plus the usefulness-score aggregator blend consumed by
//! discovery ranking (C3).

use ainp_core::{
    constants::{
        REPUTATION_ALPHA_DEFAULT, TIMELINESS_L_REF_MS, USEFULNESS_WEIGHT_COMPUTE_DEFAULT,
        USEFULNESS_WEIGHT_LEARNING_DEFAULT, USEFULNESS_WEIGHT_MEMORY_DEFAULT,
        USEFULNESS_WEIGHT_ROUTING_DEFAULT, USEFULNESS_WEIGHT_VALIDATION_DEFAULT,
    },
    ewma_update, AgentReputation, AinpError, Attestation, AttestationType, Did, UsefulnessScore,
};
use ainp_store::StoreDb;
use tracing::info;

/// Observed signals available when a receipt finalizes, feeding the EWMA
/// update on the responder's reputation vector.
#[derive(Debug, Clone, Default)]
pub struct ObservedOutcome {
    pub accepted_score: Option<f64>,
    pub audit_pass_score: Option<f64>,
    pub audit_pass_confidence: Option<f64>,
    pub safety_pass_score: Option<f64>,
    pub latency_ms: Option<f64>,
    pub finalized: bool,
}

impl ObservedOutcome {
    /// Derive the observed signals from a receipt's attestation set. `r`
    /// (reliability) is fixed at 1.0 here since this is only ever called on
    /// a path that reaches `finalized`.
    pub fn from_attestations(attestations: &[Attestation], latency_ms: Option<f64>) -> Self {
        let mut out = ObservedOutcome {
            latency_ms,
            finalized: true,
            ..Default::default()
        };
        for att in attestations {
            match att.attestation_type {
                AttestationType::Accepted => out.accepted_score = att.score.or(out.accepted_score),
                AttestationType::AuditPass => {
                    out.audit_pass_score = att.score.or(out.audit_pass_score);
                    out.audit_pass_confidence = att.confidence.or(out.audit_pass_confidence);
                }
                AttestationType::SafetyPass => {
                    out.safety_pass_score = att.score.or(out.safety_pass_score)
                }
            }
        }
        out
    }
}

#[derive(Clone)]
pub struct ReputationEngine {
    db: StoreDb,
    alpha: f64,
}

impl ReputationEngine {
    pub fn new(db: StoreDb, alpha: f64) -> Self {
        ReputationEngine {
            db,
            alpha: if alpha > 0.0 {
                alpha
            } else {
                REPUTATION_ALPHA_DEFAULT
            },
        }
    }

    /// Apply one finalized-receipt observation to `agent_did`'s reputation
    /// vector, creating a neutral prior if none exists yet.
    ///
    /// Impact and Efficiency have no defined signal source in a single
    /// receipt's attestations; they are left unchanged (EWMA with
    /// `observed == old` is a no-op).
    pub fn record_outcome(
        &self,
        agent_did: &Did,
        outcome: &ObservedOutcome,
        now: i64,
    ) -> Result<AgentReputation, AinpError> {
        let mut rep = self
            .db
            .get_reputation(agent_did)?
            .unwrap_or_else(|| AgentReputation::neutral(agent_did.clone(), now));

        if let Some(q_observed) = quality_signal(outcome) {
            rep.q = ewma_update(rep.q, q_observed, self.alpha);
        }
        if let Some(latency) = outcome.latency_ms {
            let t_observed = (1.0 - (latency / TIMELINESS_L_REF_MS).min(1.0)).max(0.0);
            rep.t = ewma_update(rep.t, t_observed, self.alpha);
        }
        let r_observed = if outcome.finalized { 1.0 } else { 0.0 };
        rep.r = ewma_update(rep.r, r_observed, self.alpha);
        if let Some(s_observed) = outcome.safety_pass_score {
            rep.s = ewma_update(rep.s, s_observed, self.alpha);
        }
        if let Some(v_observed) = outcome.audit_pass_confidence {
            rep.v = ewma_update(rep.v, v_observed, self.alpha);
        }
        rep.updated_at = now;

        self.db.put_reputation(&rep)?;
        info!(agent_did = %agent_did, q = rep.q, t = rep.t, r = rep.r, "reputation updated");
        Ok(rep)
    }

    pub fn get(&self, agent_did: &Did) -> Result<Option<AgentReputation>, AinpError> {
        self.db.get_reputation(agent_did)
    }

    /// Recompute every agent's cached usefulness score from its current
    /// reputation vector. Run periodically by the scheduler (C11).
    ///
    /// The blend weights (compute/memory/routing/validation/learning) map
    /// onto the reputation vector's dimensions as: compute -> efficiency,
    /// memory -> impact, routing -> timeliness, validation -> truth-value,
    /// learning -> quality. They need not sum to 1; the result is clamped
    /// to `[0,100]` rather than renormalized.
    pub fn aggregate_usefulness(&self, now: i64) -> Result<usize, AinpError> {
        let mut updated = 0;
        for rep in self.db.iter_reputations()? {
            let blended = USEFULNESS_WEIGHT_COMPUTE_DEFAULT * rep.e
                + USEFULNESS_WEIGHT_MEMORY_DEFAULT * rep.i
                + USEFULNESS_WEIGHT_ROUTING_DEFAULT * rep.t
                + USEFULNESS_WEIGHT_VALIDATION_DEFAULT * rep.v
                + USEFULNESS_WEIGHT_LEARNING_DEFAULT * rep.q;
            let usefulness_score = (blended * 100.0).clamp(0.0, 100.0);
            self.db.put_usefulness_score(&UsefulnessScore {
                agent_id: rep.agent_did.clone(),
                usefulness_score,
                last_updated: now,
            })?;
            updated += 1;
        }
        Ok(updated)
    }
}

fn quality_signal(outcome: &ObservedOutcome) -> Option<f64> {
    match (outcome.accepted_score, outcome.audit_pass_score) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
