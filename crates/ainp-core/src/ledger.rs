use serde::{Deserialize, Serialize};

use crate::types::{AtomicAmount, Did, TransactionId};

/// A per-DID credit account. The single row per DID is the sole durable
/// source of truth; all mutations go through `ainp-ledger`'s atomic API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub agent_did: Did,
    pub balance: AtomicAmount,
    pub reserved: AtomicAmount,
    pub earned: AtomicAmount,
    pub spent: AtomicAmount,
}

impl CreditAccount {
    pub fn new(agent_did: Did, initial_balance: AtomicAmount) -> Self {
        CreditAccount {
            agent_did,
            balance: initial_balance,
            reserved: 0,
            earned: 0,
            spent: 0,
        }
    }

    /// `balance >= 0 && reserved >= 0` — both are unsigned here so this is a
    /// structural invariant, asserted in tests rather than checked at runtime.
    pub fn is_valid(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Reserve,
    Release,
    Earn,
    Spend,
}

/// Immutable append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub agent_did: Did,
    pub tx_type: TransactionType,
    pub amount: AtomicAmount,
    #[serde(default)]
    pub counterparty: Option<Did>,
    pub reference: String,
    #[serde(default)]
    pub usefulness_proof_id: Option<String>,
    pub created_at: i64,
}
