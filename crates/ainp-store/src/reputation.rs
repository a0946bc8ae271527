use ainp_core::{AgentReputation, AinpError, Did};

use crate::db::{tree_get, tree_iter_values, tree_put, StoreDb};

impl StoreDb {
    pub fn get_reputation(&self, did: &Did) -> Result<Option<AgentReputation>, AinpError> {
        tree_get(&self.agent_reputations, did.as_str().as_bytes())
    }

    pub fn put_reputation(&self, rep: &AgentReputation) -> Result<(), AinpError> {
        tree_put(&self.agent_reputations, rep.agent_did.as_str().as_bytes(), rep)
    }

    pub fn iter_reputations(&self) -> Result<Vec<AgentReputation>, AinpError> {
        tree_iter_values(&self.agent_reputations)
    }
}
