//! Receipts & committee (C8): deterministic committee sampling, attestation
//! ingest, and the quorum finalization sweep.

use ainp_core::{
    constants::{POU_K_DEFAULT, POU_M_DEFAULT},
    AinpError, Attestation, AtomicAmount, Did, ReceiptId, ReceiptMetrics, ReceiptStatus,
    TaskReceipt,
};
use ainp_reputation::{ObservedOutcome, ReputationEngine};
use ainp_store::StoreDb;
use tracing::info;

#[derive(Clone)]
pub struct ReceiptEngine {
    db: StoreDb,
    reputation: ReputationEngine,
}

impl ReceiptEngine {
    pub fn new(db: StoreDb, reputation: ReputationEngine) -> Self {
        ReceiptEngine { db, reputation }
    }

    /// Create a `pending` receipt, sampling its committee deterministically
    /// from the current active-agent roster if one wasn't supplied.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        negotiation_id: Option<String>,
        intent_id: Option<String>,
        agent_did: Did,
        client_did: Did,
        metrics: ReceiptMetrics,
        amount_atomic: AtomicAmount,
        k: usize,
        m: usize,
        salt: &str,
        now: i64,
    ) -> Result<TaskReceipt, AinpError> {
        let id = ReceiptId::new(blake3::hash(
            format!("{agent_did}:{client_did}:{now}:{salt}").as_bytes(),
        ).to_hex().to_string());
        let committee_seed = committee_seed(&id, salt);
        let roster = self.active_roster(now)?;
        let committee = sample_committee(&roster, &committee_seed, m.max(POU_M_DEFAULT));

        let receipt = TaskReceipt {
            id,
            negotiation_id,
            intent_id,
            agent_did,
            client_did,
            metrics,
            amount_atomic,
            status: ReceiptStatus::Pending,
            committee,
            k: if k > 0 { k } else { POU_K_DEFAULT },
            m: if m > 0 { m } else { POU_M_DEFAULT },
            committee_seed,
            finalized_at: None,
            created_at: now,
        };
        self.db.put_receipt(&receipt)?;
        info!(receipt_id = %receipt.id, committee = receipt.committee.len(), "receipt created");
        Ok(receipt)
    }

    pub fn get(&self, id: &ReceiptId) -> Result<Option<TaskReceipt>, AinpError> {
        self.db.get_receipt(id)
    }

    pub fn committee(&self, id: &ReceiptId) -> Result<Vec<Did>, AinpError> {
        Ok(self
            .db
            .get_receipt(id)?
            .ok_or_else(|| AinpError::NotFound(format!("no receipt {}", id.as_str())))?
            .committee)
    }

    /// Record an attestation. Rejects duplicates on `(task_id, by_did,
    /// type)` by returning `Ok(false)` rather than erroring, since a retried
    /// attestation submission is not itself a client error.
    pub fn attest(&self, attestation: Attestation) -> Result<bool, AinpError> {
        self.db
            .get_receipt(&attestation.task_id)?
            .ok_or_else(|| AinpError::NotFound(format!("no receipt {}", attestation.task_id.as_str())))?;
        self.db.put_attestation_if_absent(&attestation)
    }

    pub fn attestations(&self, id: &ReceiptId) -> Result<Vec<Attestation>, AinpError> {
        self.db.attestations_for_receipt(id)
    }

    /// Count of qualifying attestations: `AUDIT_PASS` by a committee member,
    /// plus an `ACCEPTED` attestation by the client.
    pub fn qualifying_count(&self, receipt: &TaskReceipt) -> Result<usize, AinpError> {
        let attestations = self.db.attestations_for_receipt(&receipt.id)?;
        let mut count = 0;
        for att in &attestations {
            let qualifies = match att.attestation_type {
                ainp_core::AttestationType::AuditPass => receipt.committee.contains(&att.by_did),
                ainp_core::AttestationType::Accepted => att.by_did == receipt.client_did,
                ainp_core::AttestationType::SafetyPass => false,
            };
            if qualifies {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Manually finalize a single receipt; `QUORUM_NOT_MET` if the count is
    /// short of `k`. Returns the finalized receipt.
    pub fn finalize(&self, id: &ReceiptId, now: i64) -> Result<TaskReceipt, AinpError> {
        let mut receipt = self
            .db
            .get_receipt(id)?
            .ok_or_else(|| AinpError::NotFound(format!("no receipt {}", id.as_str())))?;
        if receipt.status != ReceiptStatus::Pending {
            return Ok(receipt);
        }
        let count = self.qualifying_count(&receipt)?;
        if count < receipt.k {
            return Err(AinpError::QuorumNotMet {
                have: count,
                need: receipt.k,
            });
        }
        receipt.status = ReceiptStatus::Finalized;
        receipt.finalized_at = Some(now);
        self.db.put_receipt(&receipt)?;

        let attestations = self.db.attestations_for_receipt(&receipt.id)?;
        let outcome = ObservedOutcome::from_attestations(&attestations, receipt.metrics.latency_ms);
        self.reputation
            .record_outcome(&receipt.agent_did, &outcome, now)?;

        Ok(receipt)
    }

    /// The finalizer job's sweep: finalize every pending receipt (up to
    /// `limit`) that has reached quorum; leave the rest pending. Never
    /// transitions a receipt out of `finalized` once set.
    pub fn finalization_sweep(&self, limit: usize, now: i64) -> Result<Vec<TaskReceipt>, AinpError> {
        let mut finalized = Vec::new();
        for receipt in self.db.iter_pending_receipts(limit)? {
            let count = self.qualifying_count(&receipt)?;
            if count >= receipt.k {
                match self.finalize(&receipt.id, now) {
                    Ok(r) => finalized.push(r),
                    Err(AinpError::QuorumNotMet { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(finalized)
    }

    fn active_roster(&self, now: i64) -> Result<Vec<Did>, AinpError> {
        let mut roster: Vec<Did> = self
            .db
            .iter_agents()?
            .into_iter()
            .filter(|a| !a.is_expired(now))
            .map(|a| a.did)
            .collect();
        roster.sort();
        Ok(roster)
    }
}

fn committee_seed(receipt_id: &ReceiptId, salt: &str) -> String {
    blake3::hash(format!("{}{}", receipt_id.as_str(), salt).as_bytes())
        .to_hex()
        .to_string()
}

/// Deterministic sampling: sort the roster by `blake3(seed || did)` and take
/// the first `m`. Reproducible given the same seed and roster snapshot,
/// without needing a seeded PRNG dependency.
fn sample_committee(roster: &[Did], seed: &str, m: usize) -> Vec<Did> {
    let mut scored: Vec<(blake3::Hash, &Did)> = roster
        .iter()
        .map(|did| (blake3::hash(format!("{seed}{did}").as_bytes()), did))
        .collect();
    scored.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    scored.into_iter().take(m).map(|(_, did)| did.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{Agent, AttestationId};

    fn temp_engine() -> ReceiptEngine {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let reputation = ReputationEngine::new(db.clone(), ainp_core::constants::REPUTATION_ALPHA_DEFAULT);
        ReceiptEngine::new(db, reputation)
    }

    fn put_agent(engine: &ReceiptEngine, did: &str, now: i64) {
        engine
            .db
            .put_agent(&Agent {
                did: Did::new(did),
                public_key: vec![1, 2, 3],
                first_seen: now,
                last_seen: now,
                expires_at: Some(now + 100_000),
            })
            .unwrap();
    }

    #[test]
    fn committee_sampling_is_deterministic_given_same_seed_and_roster() {
        let engine = temp_engine();
        for i in 0..10 {
            put_agent(&engine, &format!("did:key:z{i}"), 0);
        }
        let roster = engine.active_roster(0).unwrap();
        let seed = "fixed-seed";
        let c1 = sample_committee(&roster, seed, 5);
        let c2 = sample_committee(&roster, seed, 5);
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 5);
    }

    #[test]
    fn attestation_against_unknown_receipt_is_not_found() {
        let engine = temp_engine();
        let att = Attestation {
            id: AttestationId::new("a1"),
            task_id: ReceiptId::new("nope"),
            by_did: Did::new("did:key:zA"),
            attestation_type: ainp_core::AttestationType::AuditPass,
            score: Some(1.0),
            confidence: Some(1.0),
            evidence_ref: None,
            signature: None,
            created_at: 0,
        };
        let err = engine.attest(att).unwrap_err();
        assert!(matches!(err, AinpError::NotFound(_)));
    }

    #[test]
    fn finalize_fails_before_quorum_then_succeeds_at_k() {
        let engine = temp_engine();
        for i in 0..5 {
            put_agent(&engine, &format!("did:key:zc{i}"), 0);
        }
        let receipt = engine
            .create(
                None,
                None,
                Did::new("did:key:zAgent"),
                Did::new("did:key:zClient"),
                ReceiptMetrics::default(),
                1000,
                2,
                5,
                "salt",
                0,
            )
            .unwrap();

        let err = engine.finalize(&receipt.id, 10).unwrap_err();
        assert!(matches!(err, AinpError::QuorumNotMet { have: 0, need: 2 }));

        for (i, member) in receipt.committee.iter().take(2).enumerate() {
            engine
                .attest(Attestation {
                    id: AttestationId::new(format!("att{i}")),
                    task_id: receipt.id.clone(),
                    by_did: member.clone(),
                    attestation_type: ainp_core::AttestationType::AuditPass,
                    score: Some(0.9),
                    confidence: Some(0.9),
                    evidence_ref: None,
                    signature: None,
                    created_at: 0,
                })
                .unwrap();
        }

        let finalized = engine.finalize(&receipt.id, 20).unwrap();
        assert_eq!(finalized.status, ReceiptStatus::Finalized);
        assert_eq!(finalized.finalized_at, Some(20));

        let rep = engine.reputation.get(&finalized.agent_did).unwrap().unwrap();
        assert!(rep.q > 0.5, "quality should move off the neutral prior after a qualifying AUDIT_PASS");
        assert!(rep.v > 0.5, "truth-value should move off the neutral prior from audit confidence");
    }

    #[test]
    fn finalization_sweep_never_touches_already_finalized() {
        let engine = temp_engine();
        for i in 0..5 {
            put_agent(&engine, &format!("did:key:zc{i}"), 0);
        }
        let receipt = engine
            .create(
                None,
                None,
                Did::new("did:key:zAgent"),
                Did::new("did:key:zClient"),
                ReceiptMetrics::default(),
                1000,
                1,
                5,
                "salt",
                0,
            )
            .unwrap();
        engine
            .attest(Attestation {
                id: AttestationId::new("att0"),
                task_id: receipt.id.clone(),
                by_did: receipt.committee[0].clone(),
                attestation_type: ainp_core::AttestationType::AuditPass,
                score: Some(1.0),
                confidence: Some(1.0),
                evidence_ref: None,
                signature: None,
                created_at: 0,
            })
            .unwrap();
        let swept = engine.finalization_sweep(100, 5).unwrap();
        assert_eq!(swept.len(), 1);
        let swept_again = engine.finalization_sweep(100, 10).unwrap();
        assert_eq!(swept_again.len(), 0);
    }
}
