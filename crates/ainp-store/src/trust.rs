use ainp_core::{AinpError, Did, TrustVector, UsefulnessScore};

use crate::db::{tree_get, tree_put, StoreDb};

impl StoreDb {
    pub fn get_trust_vector(&self, did: &Did) -> Result<Option<TrustVector>, AinpError> {
        tree_get(&self.trust_vectors, did.as_str().as_bytes())
    }

    pub fn put_trust_vector(&self, tv: &TrustVector) -> Result<(), AinpError> {
        tree_put(&self.trust_vectors, tv.agent_id.as_str().as_bytes(), tv)
    }

    pub fn get_usefulness_score(&self, did: &Did) -> Result<Option<UsefulnessScore>, AinpError> {
        tree_get(&self.usefulness_scores, did.as_str().as_bytes())
    }

    pub fn put_usefulness_score(&self, score: &UsefulnessScore) -> Result<(), AinpError> {
        tree_put(
            &self.usefulness_scores,
            score.agent_id.as_str().as_bytes(),
            score,
        )
    }
}
