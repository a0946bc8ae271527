use ainp_core::{AinpError, NegotiationSession, SessionId};

use crate::db::{tree_get, tree_iter_values, tree_put, StoreDb};

impl StoreDb {
    pub fn get_session(&self, id: &SessionId) -> Result<Option<NegotiationSession>, AinpError> {
        tree_get(&self.negotiation_sessions, id.as_str().as_bytes())
    }

    pub fn put_session(&self, session: &NegotiationSession) -> Result<(), AinpError> {
        tree_put(
            &self.negotiation_sessions,
            session.id.as_str().as_bytes(),
            session,
        )
    }

    pub fn iter_sessions(&self) -> Result<Vec<NegotiationSession>, AinpError> {
        tree_iter_values(&self.negotiation_sessions)
    }
}
