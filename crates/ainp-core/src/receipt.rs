use serde::{Deserialize, Serialize};

use crate::types::{AttestationId, AtomicAmount, Did, ReceiptId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Finalized,
    Disputed,
    Failed,
}

/// A record asserting that a piece of agent work happened; finalized once a
/// quorum of committee attestations is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub id: ReceiptId,
    #[serde(default)]
    pub negotiation_id: Option<String>,
    #[serde(default)]
    pub intent_id: Option<String>,
    pub agent_did: Did,
    pub client_did: Did,
    #[serde(default)]
    pub metrics: ReceiptMetrics,
    pub amount_atomic: AtomicAmount,
    pub status: ReceiptStatus,
    pub committee: Vec<Did>,
    pub k: usize,
    pub m: usize,
    pub committee_seed: String,
    #[serde(default)]
    pub finalized_at: Option<i64>,
    pub created_at: i64,
}

/// Observed signals feeding the reputation update on finalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptMetrics {
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub accepted_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttestationType {
    Accepted,
    AuditPass,
    SafetyPass,
}

/// A single attestation against a receipt. Uniqueness: `(task_id, by_did, type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub id: AttestationId,
    pub task_id: ReceiptId,
    pub by_did: Did,
    #[serde(rename = "type")]
    pub attestation_type: AttestationType,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence_ref: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    pub created_at: i64,
}
