use std::path::Path;

use ainp_core::AinpError;

/// Wraps the embedded sled database and every named tree the broker's
/// components read and write. One tree per entity collection, mirroring the
/// rest of this crate's one-file-per-entity-group layout.
#[derive(Clone)]
pub struct StoreDb {
    pub(crate) db: sled::Db,

    pub(crate) agents: sled::Tree,
    pub(crate) capabilities: sled::Tree,
    pub(crate) trust_vectors: sled::Tree,
    pub(crate) usefulness_scores: sled::Tree,

    pub(crate) credit_accounts: sled::Tree,
    pub(crate) credit_transactions: sled::Tree,

    pub(crate) contacts: sled::Tree,
    pub(crate) messages: sled::Tree,

    pub(crate) negotiation_sessions: sled::Tree,

    pub(crate) task_receipts: sled::Tree,
    pub(crate) attestations: sled::Tree,

    pub(crate) agent_reputations: sled::Tree,

    pub(crate) antifraud_replay: sled::Tree,
    pub(crate) antifraud_content_hash: sled::Tree,
    pub(crate) antifraud_greylist: sled::Tree,

    pub(crate) meta: sled::Tree,
}

impl StoreDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AinpError> {
        let db = sled::open(path).map_err(|e| AinpError::Storage(e.to_string()))?;
        let open_tree = |name: &str| -> Result<sled::Tree, AinpError> {
            db.open_tree(name)
                .map_err(|e| AinpError::Storage(format!("opening tree {name}: {e}")))
        };

        Ok(StoreDb {
            agents: open_tree("agents")?,
            capabilities: open_tree("capabilities")?,
            trust_vectors: open_tree("trust_vectors")?,
            usefulness_scores: open_tree("usefulness_scores")?,
            credit_accounts: open_tree("credit_accounts")?,
            credit_transactions: open_tree("credit_transactions")?,
            contacts: open_tree("contacts")?,
            messages: open_tree("messages")?,
            negotiation_sessions: open_tree("negotiation_sessions")?,
            task_receipts: open_tree("task_receipts")?,
            attestations: open_tree("attestations")?,
            agent_reputations: open_tree("agent_reputations")?,
            antifraud_replay: open_tree("antifraud_replay")?,
            antifraud_content_hash: open_tree("antifraud_content_hash")?,
            antifraud_greylist: open_tree("antifraud_greylist")?,
            meta: open_tree("meta")?,
            db,
        })
    }

    pub fn flush(&self) -> Result<(), AinpError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| AinpError::Storage(e.to_string()))
    }

    /// Monotonic counter stored in the meta tree, keyed by `name`. Used for
    /// sequence numbers (e.g. per-account ledger transaction `seq`).
    pub fn next_seq(&self, name: &str) -> Result<u64, AinpError> {
        let key = format!("seq:{name}");
        let next = self
            .meta
            .update_and_fetch(key.as_bytes(), |old| {
                let current = old
                    .map(|b| u64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
                    .unwrap_or(0);
                Some((current + 1).to_be_bytes().to_vec())
            })
            .map_err(|e| AinpError::Storage(e.to_string()))?
            .expect("update_and_fetch always produces a value");
        Ok(u64::from_be_bytes(next.as_ref().try_into().unwrap()))
    }

    /// Atomically mark an idempotency key as seen in the meta tree. Returns
    /// `true` the first time `key` is observed, `false` on every subsequent
    /// call — used by the payment webhook boundary, which unlike the
    /// antifraud TTL caches must dedupe forever rather than for a window.
    pub fn mark_idempotent(&self, key: &str) -> Result<bool, AinpError> {
        let full_key = format!("idem:{key}");
        let mut first_sight = false;
        self.meta
            .fetch_and_update(full_key.as_bytes(), |existing| {
                first_sight = existing.is_none();
                Some(vec![1u8])
            })
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(first_sight)
    }
}

/// Serialize with bincode, mapping errors into `AinpError::Serialization`.
pub(crate) fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, AinpError> {
    bincode::serialize(value).map_err(|e| AinpError::Serialization(e.to_string()))
}

/// Deserialize with bincode, mapping errors into `AinpError::Serialization`.
pub(crate) fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, AinpError> {
    bincode::deserialize(bytes).map_err(|e| AinpError::Serialization(e.to_string()))
}

pub(crate) fn tree_get<T: serde::de::DeserializeOwned>(
    tree: &sled::Tree,
    key: &[u8],
) -> Result<Option<T>, AinpError> {
    match tree.get(key).map_err(|e| AinpError::Storage(e.to_string()))? {
        Some(bytes) => Ok(Some(de(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn tree_put<T: serde::Serialize>(
    tree: &sled::Tree,
    key: &[u8],
    value: &T,
) -> Result<(), AinpError> {
    tree.insert(key, ser(value)?)
        .map_err(|e| AinpError::Storage(e.to_string()))?;
    Ok(())
}

pub(crate) fn tree_iter_values<T: serde::de::DeserializeOwned>(
    tree: &sled::Tree,
) -> Result<Vec<T>, AinpError> {
    tree.iter()
        .values()
        .map(|r| {
            let bytes = r.map_err(|e| AinpError::Storage(e.to_string()))?;
            de(&bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> StoreDb {
        let dir = tempfile::tempdir().unwrap();
        StoreDb::open(dir.path()).unwrap()
    }

    #[test]
    fn next_seq_is_monotonic_per_name() {
        let db = temp_db();
        assert_eq!(db.next_seq("a").unwrap(), 1);
        assert_eq!(db.next_seq("a").unwrap(), 2);
        assert_eq!(db.next_seq("b").unwrap(), 1);
    }

    #[test]
    fn mark_idempotent_is_true_only_on_first_sight() {
        let db = temp_db();
        assert!(db.mark_idempotent("req-1").unwrap());
        assert!(!db.mark_idempotent("req-1").unwrap());
        assert!(db.mark_idempotent("req-2").unwrap());
    }
}
