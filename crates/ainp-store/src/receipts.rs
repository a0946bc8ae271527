use ainp_core::{AinpError, Attestation, ReceiptId, TaskReceipt};

use crate::db::{de, ser, tree_get, tree_iter_values, tree_put, StoreDb};

impl StoreDb {
    pub fn get_receipt(&self, id: &ReceiptId) -> Result<Option<TaskReceipt>, AinpError> {
        tree_get(&self.task_receipts, id.as_str().as_bytes())
    }

    pub fn put_receipt(&self, receipt: &TaskReceipt) -> Result<(), AinpError> {
        tree_put(&self.task_receipts, receipt.id.as_str().as_bytes(), receipt)
    }

    pub fn iter_pending_receipts(&self, limit: usize) -> Result<Vec<TaskReceipt>, AinpError> {
        let mut out = Vec::new();
        for entry in self.task_receipts.iter().values() {
            let bytes = entry.map_err(|e| AinpError::Storage(e.to_string()))?;
            let receipt: TaskReceipt = de(&bytes)?;
            if receipt.status == ainp_core::ReceiptStatus::Pending {
                out.push(receipt);
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    /// Insert an attestation iff `(task_id, by_did, type)` is not already
    /// present; returns `false` on duplicate.
    pub fn put_attestation_if_absent(&self, att: &Attestation) -> Result<bool, AinpError> {
        let key = attestation_key(&att.task_id, &att.by_did, att.attestation_type);
        let existing = self
            .attestations
            .get(&key)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        if existing.is_some() {
            return Ok(false);
        }
        self.attestations
            .insert(key, ser(att)?)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(true)
    }

    pub fn attestations_for_receipt(&self, id: &ReceiptId) -> Result<Vec<Attestation>, AinpError> {
        let prefix = id.as_str().as_bytes().to_vec();
        self.attestations
            .scan_prefix(&prefix)
            .values()
            .map(|r| {
                let bytes = r.map_err(|e| AinpError::Storage(e.to_string()))?;
                de(&bytes)
            })
            .collect()
    }

    pub fn iter_all_receipts(&self) -> Result<Vec<TaskReceipt>, AinpError> {
        tree_iter_values(&self.task_receipts)
    }
}

fn attestation_key(
    task_id: &ReceiptId,
    by_did: &ainp_core::Did,
    attestation_type: ainp_core::AttestationType,
) -> Vec<u8> {
    let mut key = task_id.as_str().as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(by_did.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(format!("{attestation_type:?}").as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{AttestationId, AttestationType, Did};

    fn temp_db() -> StoreDb {
        let dir = tempfile::tempdir().unwrap();
        StoreDb::open(dir.path()).unwrap()
    }

    #[test]
    fn attestation_uniqueness_by_task_agent_type() {
        let db = temp_db();
        let task = ReceiptId::new("r1");
        let did = Did::new("did:key:zA");
        let att = Attestation {
            id: AttestationId::new("a1"),
            task_id: task.clone(),
            by_did: did.clone(),
            attestation_type: AttestationType::AuditPass,
            score: Some(1.0),
            confidence: Some(0.9),
            evidence_ref: None,
            signature: None,
            created_at: 0,
        };
        assert!(db.put_attestation_if_absent(&att).unwrap());
        assert!(!db.put_attestation_if_absent(&att).unwrap());

        let second = Attestation {
            id: AttestationId::new("a2"),
            attestation_type: AttestationType::Accepted,
            ..att
        };
        assert!(db.put_attestation_if_absent(&second).unwrap());
        assert_eq!(db.attestations_for_receipt(&task).unwrap().len(), 2);
    }
}
