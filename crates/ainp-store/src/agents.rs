use ainp_core::{Agent, AinpError, Capability, Did};

use crate::db::{ser, tree_get, tree_iter_values, tree_put, StoreDb};

impl StoreDb {
    pub fn get_agent(&self, did: &Did) -> Result<Option<Agent>, AinpError> {
        tree_get(&self.agents, did.as_str().as_bytes())
    }

    pub fn put_agent(&self, agent: &Agent) -> Result<(), AinpError> {
        tree_put(&self.agents, agent.did.as_str().as_bytes(), agent)
    }

    pub fn iter_agents(&self) -> Result<Vec<Agent>, AinpError> {
        tree_iter_values(&self.agents)
    }

    /// Replace an agent's entire capability set atomically: delete all
    /// existing rows for `agent_id`, then insert `capabilities`. Capabilities
    /// are keyed by `agent_id || '\0' || capability_id` so a prefix scan
    /// finds exactly one agent's rows.
    pub fn replace_capabilities(
        &self,
        agent_id: &Did,
        capabilities: &[Capability],
    ) -> Result<(), AinpError> {
        let prefix = capability_prefix(agent_id);
        let mut batch = sled::Batch::default();
        for existing in self.capabilities.scan_prefix(&prefix).keys() {
            let key = existing.map_err(|e| AinpError::Storage(e.to_string()))?;
            batch.remove(key);
        }
        for cap in capabilities {
            let key = capability_key(agent_id, cap.id.as_str());
            batch.insert(key, ser(cap)?);
        }
        self.capabilities
            .apply_batch(batch)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn capabilities_for_agent(&self, agent_id: &Did) -> Result<Vec<Capability>, AinpError> {
        let prefix = capability_prefix(agent_id);
        self.capabilities
            .scan_prefix(&prefix)
            .values()
            .map(|r| {
                let bytes = r.map_err(|e| AinpError::Storage(e.to_string()))?;
                crate::db::de(&bytes)
            })
            .collect()
    }

    pub fn iter_all_capabilities(&self) -> Result<Vec<Capability>, AinpError> {
        tree_iter_values(&self.capabilities)
    }
}

fn capability_prefix(agent_id: &Did) -> Vec<u8> {
    let mut key = agent_id.as_str().as_bytes().to_vec();
    key.push(0);
    key
}

fn capability_key(agent_id: &Did, capability_id: &str) -> Vec<u8> {
    let mut key = capability_prefix(agent_id);
    key.extend_from_slice(capability_id.as_bytes());
    key
}
