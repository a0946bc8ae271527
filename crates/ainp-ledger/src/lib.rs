//! The credit ledger (C2): atomic balance/reserved/earned/spent fields with
//! concurrency-safe operations, serialized per DID.

mod shard;

use std::sync::Arc;

use ainp_core::{AinpError, AtomicAmount, CreditAccount, CreditTransaction, Did, TransactionId, TransactionType};
use ainp_store::StoreDb;
use tracing::info;

use shard::ShardedLocks;

/// Cheap to clone: `db` is itself a handle to shared sled trees, and `locks`
/// is reference-counted so every clone still serializes on the same shard
/// mutexes. Components that need a ledger (the pipeline, negotiation engine,
/// HTTP handlers) each hold their own clone of one instance created at
/// startup.
#[derive(Clone)]
pub struct CreditLedger {
    db: StoreDb,
    locks: Arc<ShardedLocks>,
}

impl CreditLedger {
    pub fn new(db: StoreDb) -> Self {
        CreditLedger {
            db,
            locks: Arc::new(ShardedLocks::new()),
        }
    }

    /// Idempotent: if the account already exists, returns it unchanged.
    pub fn create_account(
        &self,
        did: &Did,
        initial_balance: AtomicAmount,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            if let Some(existing) = self.db.get_account(did)? {
                return Ok(existing);
            }
            let account = CreditAccount::new(did.clone(), initial_balance);
            self.db.put_account(&account)?;
            Ok(account)
        })
    }

    pub fn get_account(&self, did: &Did) -> Result<Option<CreditAccount>, AinpError> {
        self.db.get_account(did)
    }

    /// `balance -= amount; reserved += amount` iff `balance >= amount`.
    pub fn reserve(
        &self,
        did: &Did,
        amount: AtomicAmount,
        reference: &str,
        now: i64,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            let mut account = self.require_account(did)?;
            if account.balance < amount {
                return Err(AinpError::InsufficientFunds);
            }
            account.balance -= amount;
            account.reserved += amount;
            self.commit(&account, TransactionType::Reserve, amount, None, reference, None, now)?;
            Ok(account)
        })
    }

    /// `reserved -= reserved_amount; balance += (reserved_amount - spend_amount); spent += spend_amount`.
    pub fn release(
        &self,
        did: &Did,
        reserved_amount: AtomicAmount,
        spend_amount: AtomicAmount,
        reference: &str,
        now: i64,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            let mut account = self.require_account(did)?;
            if account.reserved < reserved_amount || spend_amount > reserved_amount {
                return Err(AinpError::Internal(
                    "release precondition violated: reserved >= reserved_amount >= spend_amount"
                        .into(),
                ));
            }
            account.reserved -= reserved_amount;
            account.balance += reserved_amount - spend_amount;
            account.spent += spend_amount;
            self.commit(
                &account,
                TransactionType::Release,
                reserved_amount,
                None,
                reference,
                None,
                now,
            )?;
            Ok(account)
        })
    }

    pub fn deposit(
        &self,
        did: &Did,
        amount: AtomicAmount,
        reference: &str,
        now: i64,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            let mut account = self.require_account(did)?;
            account.balance += amount;
            self.commit(&account, TransactionType::Deposit, amount, None, reference, None, now)?;
            Ok(account)
        })
    }

    pub fn earn(
        &self,
        did: &Did,
        amount: AtomicAmount,
        reference: &str,
        proof_id: Option<&str>,
        now: i64,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            let mut account = self.require_account(did)?;
            account.balance += amount;
            account.earned += amount;
            self.commit(
                &account,
                TransactionType::Earn,
                amount,
                None,
                reference,
                proof_id,
                now,
            )?;
            Ok(account)
        })
    }

    pub fn spend(
        &self,
        did: &Did,
        amount: AtomicAmount,
        reference: &str,
        now: i64,
    ) -> Result<CreditAccount, AinpError> {
        self.locks.with_lock(did, || {
            let mut account = self.require_account(did)?;
            if account.balance < amount {
                return Err(AinpError::InsufficientFunds);
            }
            account.balance -= amount;
            account.spent += amount;
            self.commit(&account, TransactionType::Spend, amount, None, reference, None, now)?;
            Ok(account)
        })
    }

    pub fn transaction_history(
        &self,
        did: &Did,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>, AinpError> {
        self.db.transaction_history(did, limit, offset)
    }

    fn require_account(&self, did: &Did) -> Result<CreditAccount, AinpError> {
        self.db
            .get_account(did)?
            .ok_or_else(|| AinpError::NotFound(format!("no ledger account for {did}")))
    }

    /// Persist the mutated account row and append its transaction log entry
    /// as a single store-level commit — a partial success here is a defect.
    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        account: &CreditAccount,
        tx_type: TransactionType,
        amount: AtomicAmount,
        counterparty: Option<Did>,
        reference: &str,
        usefulness_proof_id: Option<&str>,
        now: i64,
    ) -> Result<(), AinpError> {
        let seq = self.db.next_seq(&format!("ledger:{}", account.agent_did))?;
        let tx_id = blake3::hash(
            format!(
                "{}:{:?}:{}:{}:{}",
                account.agent_did, tx_type, amount, reference, seq
            )
            .as_bytes(),
        );
        let tx = CreditTransaction {
            id: TransactionId::new(hex::encode(tx_id.as_bytes())),
            agent_did: account.agent_did.clone(),
            tx_type,
            amount,
            counterparty,
            reference: reference.to_string(),
            usefulness_proof_id: usefulness_proof_id.map(|s| s.to_string()),
            created_at: now,
        };
        self.db.put_account(account)?;
        self.db.append_transaction(&tx, seq)?;
        info!(agent_did = %account.agent_did, tx_type = ?tx_type, amount, "ledger transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn temp_ledger() -> CreditLedger {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        CreditLedger::new(db)
    }

    #[test]
    fn create_account_is_idempotent() {
        let ledger = temp_ledger();
        let did = Did::new("did:key:zA");
        let a1 = ledger.create_account(&did, 1000).unwrap();
        let a2 = ledger.create_account(&did, 9999).unwrap();
        assert_eq!(a1.balance, a2.balance);
        assert_eq!(a2.balance, 1000);
    }

    #[test]
    fn reserve_then_release_round_trips_balance() {
        let ledger = temp_ledger();
        let did = Did::new("did:key:zA");
        ledger.create_account(&did, 1000).unwrap();
        ledger.reserve(&did, 100, "neg1", 0).unwrap();
        let account = ledger.release(&did, 100, 90, "neg1", 1).unwrap();
        assert_eq!(account.reserved, 0);
        assert_eq!(account.balance, 910);
        assert_eq!(account.spent, 90);
    }

    #[test]
    fn reserve_fails_on_insufficient_funds() {
        let ledger = temp_ledger();
        let did = Did::new("did:key:zA");
        ledger.create_account(&did, 50).unwrap();
        let err = ledger.reserve(&did, 100, "neg1", 0).unwrap_err();
        assert!(matches!(err, AinpError::InsufficientFunds));
    }

    #[test]
    fn ledger_conservation_after_earn_and_spend() {
        let ledger = temp_ledger();
        let did = Did::new("did:key:zA");
        ledger.create_account(&did, 0).unwrap();
        ledger.deposit(&did, 1000, "seed", 0).unwrap();
        ledger.earn(&did, 500, "job1", None, 1).unwrap();
        let account = ledger.spend(&did, 200, "fees", 2).unwrap();
        // deposits + earnings == balance + reserved + spent
        let deposits = 1000u64;
        let earnings = 500u64;
        assert_eq!(
            deposits + earnings,
            account.balance + account.reserved + account.spent
        );
    }

    #[test]
    fn n_concurrent_reserves_yield_exactly_k_successes() {
        let ledger = Arc::new(temp_ledger());
        let did = Did::new("did:key:zA");
        let x = 100u64;
        let k = 7u64;
        ledger.create_account(&did, k * x).unwrap();

        let n = 20;
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let did = did.clone();
                thread::spawn(move || ledger.reserve(&did, x, &format!("r{i}"), 0).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes as u64, k);
        let account = ledger.get_account(&did).unwrap().unwrap();
        assert_eq!(account.reserved, k * x);
        assert_eq!(account.balance, 0);
    }
}
