use serde::{Deserialize, Serialize};

use crate::types::{AtomicAmount, Did, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Initiated,
    Proposed,
    CounterProposed,
    Accepted,
    Rejected,
    Expired,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NegotiationState::Rejected | NegotiationState::Expired
        )
    }
}

/// The negotiable fields of a proposal. `custom` carries anything not
/// otherwise modeled, for convergence scoring over arbitrary numeric/boolean
/// extension fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub delivery_time: Option<f64>,
    #[serde(default)]
    pub quality_sla: Option<bool>,
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub round_number: u32,
    pub proposer_did: Did,
    pub proposal: Proposal,
    pub timestamp: i64,
    #[serde(default)]
    pub convergence_delta: Option<f64>,
}

/// Incentive split applied at settlement; fractions MUST sum to 1 ± 1e-4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncentiveSplit {
    pub agent: f64,
    pub broker: f64,
    pub validator: f64,
    pub pool: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub id: SessionId,
    #[serde(default)]
    pub intent_id: Option<String>,
    pub initiator_did: Did,
    pub responder_did: Did,
    pub state: NegotiationState,
    pub rounds: Vec<Round>,
    /// In [0,1]; defined only once at least two rounds exist.
    #[serde(default)]
    pub convergence_score: Option<f64>,
    pub current_proposal: Proposal,
    #[serde(default)]
    pub final_proposal: Option<Proposal>,
    pub incentive_split: IncentiveSplit,
    pub max_rounds: u32,
    /// Amount reserved against the initiator's account on acceptance, if any.
    #[serde(default)]
    pub reserved_amount: Option<AtomicAmount>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl NegotiationSession {
    pub fn last_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn last_proposer(&self) -> Option<&Did> {
        self.last_round().map(|r| &r.proposer_did)
    }
}
