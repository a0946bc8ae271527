use ainp_core::{AinpError, CreditAccount, CreditTransaction, Did};

use crate::db::{de, ser, tree_get, tree_put, StoreDb};

impl StoreDb {
    pub fn get_account(&self, did: &Did) -> Result<Option<CreditAccount>, AinpError> {
        tree_get(&self.credit_accounts, did.as_str().as_bytes())
    }

    pub fn put_account(&self, account: &CreditAccount) -> Result<(), AinpError> {
        tree_put(
            &self.credit_accounts,
            account.agent_did.as_str().as_bytes(),
            account,
        )
    }

    /// Append one ledger transaction, keyed by `agent_did || be_bytes(seq)` so
    /// a prefix scan returns an account's history in creation order.
    pub fn append_transaction(
        &self,
        tx: &CreditTransaction,
        seq: u64,
    ) -> Result<(), AinpError> {
        let key = transaction_key(&tx.agent_did, seq);
        self.credit_transactions
            .insert(key, ser(tx)?)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn transaction_history(
        &self,
        did: &Did,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>, AinpError> {
        let prefix = did.as_str().as_bytes().to_vec();
        let mut out = Vec::new();
        // Newest first: iterate the prefix range in reverse.
        for entry in self.credit_transactions.scan_prefix(&prefix).rev() {
            let (_, value) = entry.map_err(|e| AinpError::Storage(e.to_string()))?;
            out.push(de(&value)?);
        }
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }
}

fn transaction_key(did: &Did, seq: u64) -> Vec<u8> {
    let mut key = did.as_str().as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{TransactionId, TransactionType};

    fn temp_db() -> StoreDb {
        let dir = tempfile::tempdir().unwrap();
        StoreDb::open(dir.path()).unwrap()
    }

    fn make_tx(did: &Did, seq: u64) -> CreditTransaction {
        CreditTransaction {
            id: TransactionId::new(format!("tx{seq}")),
            agent_did: did.clone(),
            tx_type: TransactionType::Deposit,
            amount: 100,
            counterparty: None,
            reference: "ref".into(),
            usefulness_proof_id: None,
            created_at: seq as i64,
        }
    }

    #[test]
    fn transaction_history_orders_newest_first() {
        let db = temp_db();
        let did = Did::new("did:key:zA");
        for seq in 1..=3u64 {
            db.append_transaction(&make_tx(&did, seq), seq).unwrap();
        }
        let history = db.transaction_history(&did, 10, 0).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id.as_str(), "tx3");
        assert_eq!(history[2].id.as_str(), "tx1");
    }

    #[test]
    fn transaction_history_respects_limit_and_offset() {
        let db = temp_db();
        let did = Did::new("did:key:zA");
        for seq in 1..=5u64 {
            db.append_transaction(&make_tx(&did, seq), seq).unwrap();
        }
        let page = db.transaction_history(&did, 2, 1).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id.as_str(), "tx4");
        assert_eq!(page[1].id.as_str(), "tx3");
    }
}
