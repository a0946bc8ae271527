//! Semantic discovery (C3): capability advertisement and weighted
//! similarity search.

pub mod embedder;
pub mod rank;

use ainp_core::{Agent, AinpError, Capability, CapabilityId, Did, TrustVector};
use ainp_store::StoreDb;
use tracing::info;

pub use embedder::{Embedder, HashEmbedder};
use rank::{rank as rank_fn, similarity, RankWeights};

/// A capability as advertised by the caller, prior to storage assignment.
/// `embedding` is optional: when absent, `DiscoveryIndex::advertise` fills it
/// in via its configured `Embedder` over `description` — an embedding is
/// never persisted without its source description.
#[derive(Debug, Clone)]
pub struct CapabilityInput {
    pub description: String,
    pub embedding: Option<Vec<f32>>,
    pub tags: Vec<String>,
}

/// Cheap to clone: both fields are shared handles (a sled-backed `StoreDb`
/// and an `Arc<dyn Embedder>`). The broker holds one clone for direct
/// search/advertise calls and hands another to the router.
#[derive(Clone)]
pub struct DiscoveryIndex {
    db: StoreDb,
    embedder: std::sync::Arc<dyn Embedder>,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub embedding: Vec<f32>,
    pub min_similarity: f64,
    pub tags: Vec<String>,
    pub min_trust: f64,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct RankedCapability {
    pub agent_id: Did,
    pub capability: Capability,
    pub sim: f64,
    pub trust: f64,
    pub usefulness: f64,
    pub rank: f64,
}

impl DiscoveryIndex {
    pub fn new(db: StoreDb) -> Self {
        DiscoveryIndex {
            db,
            embedder: std::sync::Arc::new(HashEmbedder::default()),
        }
    }

    pub fn with_embedder(db: StoreDb, embedder: std::sync::Arc<dyn Embedder>) -> Self {
        DiscoveryIndex { db, embedder }
    }

    /// Embed free text with this index's configured `Embedder`, for callers
    /// building a `SearchQuery` from a description rather than a raw vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        self.embedder.embed(text)
    }

    /// Replace an agent's capability set atomically and refresh its TTL.
    pub fn advertise(
        &self,
        agent_id: &Did,
        public_key: Vec<u8>,
        capabilities: Vec<CapabilityInput>,
        ttl_ms: i64,
        now: i64,
    ) -> Result<Agent, AinpError> {
        let mut agent = self.db.get_agent(agent_id)?.unwrap_or(Agent {
            did: agent_id.clone(),
            public_key: public_key.clone(),
            first_seen: now,
            last_seen: now,
            expires_at: None,
        });
        agent.public_key = public_key;
        agent.last_seen = now;
        agent.expires_at = Some(now + ttl_ms);
        self.db.put_agent(&agent)?;

        let stored: Vec<Capability> = capabilities
            .into_iter()
            .enumerate()
            .map(|(i, input)| Capability {
                id: CapabilityId::new(format!("{}-{i}", agent_id.as_str())),
                agent_id: agent_id.clone(),
                embedding: input
                    .embedding
                    .unwrap_or_else(|| self.embedder.embed(&input.description)),
                description: input.description,
                tags: input.tags.into_iter().collect(),
                version: 1,
                evidence_ref: None,
            })
            .collect();
        self.db.replace_capabilities(agent_id, &stored)?;

        if self.db.get_trust_vector(agent_id)?.is_none() {
            self.db.put_trust_vector(&TrustVector {
                agent_id: agent_id.clone(),
                ..TrustVector::default()
            })?;
        }

        info!(agent_id = %agent_id, capabilities = stored.len(), "agent advertised");
        Ok(agent)
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        weights: RankWeights,
        now: i64,
    ) -> Result<Vec<RankedCapability>, AinpError> {
        let capabilities = self.db.iter_all_capabilities()?;
        let mut results = Vec::new();

        for cap in capabilities {
            if !query.tags.is_empty() && !query.tags.iter().any(|t| cap.tags.contains(t)) {
                continue;
            }
            let Some(agent) = self.db.get_agent(&cap.agent_id)? else {
                continue;
            };
            if agent.is_expired(now) {
                continue;
            }
            let sim = similarity(&query.embedding, &cap.embedding);
            if sim < query.min_similarity {
                continue;
            }
            let trust = self
                .db
                .get_trust_vector(&cap.agent_id)?
                .map(|tv| tv.score)
                .unwrap_or(0.5);
            if trust < query.min_trust {
                continue;
            }
            let usefulness = self
                .db
                .get_usefulness_score(&cap.agent_id)?
                .map(|u| u.usefulness_score)
                .unwrap_or(0.0);
            let r = rank_fn(sim, trust, usefulness, weights);
            results.push(RankedCapability {
                agent_id: cap.agent_id.clone(),
                capability: cap,
                sim,
                trust,
                usefulness,
                rank: r,
            });
        }

        // Tie-break: higher sim, then lexicographic did.
        results.sort_by(|a, b| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap()
                .then_with(|| b.sim.partial_cmp(&a.sim).unwrap())
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        results.truncate(query.limit);
        Ok(results)
    }

    /// Purge agents whose advertisement has expired. Called by the
    /// scheduler's expiry sweep.
    pub fn sweep_expired_agents(&self, now: i64) -> Result<usize, AinpError> {
        let mut purged = 0;
        for agent in self.db.iter_agents()? {
            if agent.is_expired(now) {
                self.db.replace_capabilities(&agent.did, &[])?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_index() -> DiscoveryIndex {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        DiscoveryIndex::new(db)
    }

    fn weights() -> RankWeights {
        RankWeights {
            w_sim: 0.6,
            w_trust: 0.3,
            w_use: 0.1,
        }
    }

    #[test]
    fn re_advertise_replaces_capability_set() {
        let idx = temp_index();
        let agent = Did::new("did:key:zA");
        idx.advertise(
            &agent,
            vec![1, 2, 3],
            vec![CapabilityInput {
                description: "does translation".into(),
                embedding: Some(vec![1.0, 0.0]),
                tags: vec![],
            }],
            60_000,
            0,
        )
        .unwrap();
        idx.advertise(
            &agent,
            vec![1, 2, 3],
            vec![CapabilityInput {
                description: "does summarization".into(),
                embedding: Some(vec![0.0, 1.0]),
                tags: vec![],
            }],
            60_000,
            1,
        )
        .unwrap();
        let q = SearchQuery {
            embedding: vec![0.0, 1.0],
            min_similarity: 0.0,
            tags: vec![],
            min_trust: 0.0,
            limit: 10,
        };
        let results = idx.search(&q, weights(), 2).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].capability.description, "does summarization");
    }

    #[test]
    fn expired_agents_excluded_from_search() {
        let idx = temp_index();
        let agent = Did::new("did:key:zA");
        idx.advertise(
            &agent,
            vec![1],
            vec![CapabilityInput {
                description: "x".into(),
                embedding: Some(vec![1.0]),
                tags: vec![],
            }],
            1000,
            0,
        )
        .unwrap();
        let q = SearchQuery {
            embedding: vec![1.0],
            min_similarity: 0.0,
            tags: vec![],
            min_trust: 0.0,
            limit: 10,
        };
        assert_eq!(idx.search(&q, weights(), 5000).unwrap().len(), 0);
        assert_eq!(idx.search(&q, weights(), 500).unwrap().len(), 1);
    }
}
