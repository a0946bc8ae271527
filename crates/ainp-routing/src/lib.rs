//! Routing (C6): delivers an accepted intent to its recipient's durable
//! mailbox and live push channel, or fans it out to the top-k discovery
//! matches when no direct recipient is named.

use std::sync::Arc;

use ainp_core::{
    AinpError, Contact, ContactState, ConversationId, Did, Intent, MailCursor, Message, MessageId,
};
use ainp_discovery::{rank::RankWeights, DiscoveryIndex, SearchQuery};
use ainp_push::PushRegistry;
use ainp_store::StoreDb;
use tracing::info;

pub const DEFAULT_FANOUT_TOP_K: usize = ainp_core::constants::DEFAULT_FANOUT_TOP_K;

/// Outcome of routing a single intent.
#[derive(Debug)]
pub struct RouteOutcome {
    pub delivered_to: Vec<Did>,
    pub persisted: bool,
}

#[derive(Clone)]
pub struct Router {
    db: StoreDb,
    discovery: DiscoveryIndex,
    push: Arc<PushRegistry>,
}

impl Router {
    pub fn new(db: StoreDb, discovery: DiscoveryIndex, push: Arc<PushRegistry>) -> Self {
        Router { db, discovery, push }
    }

    /// Route an already-admitted (pipeline-passed) intent from `from_did`.
    /// Direct recipients get a durable mailbox entry plus a best-effort
    /// push; unresolved recipients fall back to discovery-assisted fan-out
    /// over the intent's embedding, when it carries one.
    pub fn route(
        &self,
        from_did: &Did,
        to_did: Option<&Did>,
        envelope_id: &str,
        intent: &Intent,
        now: i64,
    ) -> Result<RouteOutcome, AinpError> {
        if !intent.is_persistent_message() {
            return Ok(RouteOutcome {
                delivered_to: Vec::new(),
                persisted: false,
            });
        }

        match to_did {
            Some(to) => {
                let delivered = self.deliver_direct(from_did, to, envelope_id, intent, now)?;
                Ok(RouteOutcome {
                    delivered_to: vec![delivered],
                    persisted: true,
                })
            }
            None => {
                let targets = self.fan_out_targets(intent, now)?;
                let mut delivered_to = Vec::new();
                for target in &targets {
                    self.deliver_direct(from_did, target, envelope_id, intent, now)?;
                    delivered_to.push(target.clone());
                }
                Ok(RouteOutcome {
                    delivered_to,
                    persisted: !targets.is_empty(),
                })
            }
        }
    }

    fn deliver_direct(
        &self,
        from_did: &Did,
        to_did: &Did,
        envelope_id: &str,
        intent: &Intent,
        now: i64,
    ) -> Result<Did, AinpError> {
        let (subject, body) = match intent {
            Intent::EmailMessage { subject, body } => (subject.clone(), body.clone()),
            Intent::Message { subject, body, .. } => (subject.clone(), body.clone()),
            _ => (None, String::new()),
        };
        let conversation_id = match intent {
            Intent::Message {
                conversation_id: Some(c),
                ..
            } => ConversationId::new(c.clone()),
            _ => ConversationId::new(envelope_id),
        };

        let message = Message {
            id: MessageId::new(envelope_id),
            conversation_id,
            from_did: from_did.clone(),
            to_did: to_did.clone(),
            subject,
            body,
            labels: Default::default(),
            read: false,
            attachments: Vec::new(),
            created_at: now,
        };

        let inserted = self.db.put_message_if_absent(&message)?;
        if inserted {
            self.record_contact(from_did, to_did, now)?;
            self.push.publish(to_did, Arc::new(message));
            info!(from = %from_did, to = %to_did, envelope_id, "routed message to mailbox");
        }
        Ok(to_did.clone())
    }

    fn record_contact(&self, from_did: &Did, to_did: &Did, now: i64) -> Result<(), AinpError> {
        let mut contact = self
            .db
            .get_contact(to_did, from_did)?
            .unwrap_or(Contact {
                owner_did: to_did.clone(),
                peer_did: from_did.clone(),
                state: ContactState::Unknown,
                first_seen: now,
                last_seen: now,
            });
        contact.last_seen = now;
        self.db.put_contact(&contact)
    }

    fn fan_out_targets(&self, intent: &Intent, now: i64) -> Result<Vec<Did>, AinpError> {
        let Intent::TaskRequest {
            embedding: Some(embedding),
            ..
        } = intent
        else {
            return Ok(Vec::new());
        };
        let query = SearchQuery {
            embedding: embedding.clone(),
            min_similarity: 0.0,
            tags: Vec::new(),
            min_trust: 0.0,
            limit: DEFAULT_FANOUT_TOP_K,
        };
        let weights = RankWeights {
            w_sim: 0.6,
            w_trust: 0.3,
            w_use: 0.1,
        };
        let results = self.discovery.search(&query, weights, now)?;
        Ok(results.into_iter().map(|r| r.agent_id).collect())
    }

    /// Fetch a page of `owner`'s inbox, ACL-scoped by construction (the
    /// store query is already filtered to messages addressed to `owner`).
    pub fn inbox(
        &self,
        owner: &Did,
        cursor: Option<&MailCursor>,
        label: Option<&str>,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Message>, AinpError> {
        self.db.inbox_for(owner, cursor, label, unread_only, limit)
    }

    /// Fetch a full thread, enforcing that the caller participated in at
    /// least one message of the conversation.
    pub fn thread(
        &self,
        caller: &Did,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, AinpError> {
        let messages = self.db.thread(conversation_id)?;
        if messages.is_empty() {
            return Err(AinpError::NotFound(format!(
                "no conversation {}",
                conversation_id.as_str()
            )));
        }
        if !messages.iter().any(|m| m.is_participant(caller)) {
            return Err(AinpError::Forbidden);
        }
        Ok(messages)
    }

    pub fn mark_read(&self, caller: &Did, created_at: i64, id: &MessageId) -> Result<(), AinpError> {
        let mut message = self
            .db
            .get_message(created_at, id)?
            .ok_or_else(|| AinpError::NotFound(format!("no message {}", id.as_str())))?;
        if &message.to_did != caller {
            return Err(AinpError::Forbidden);
        }
        message.read = true;
        self.db.update_message(&message)
    }

    pub fn label(
        &self,
        caller: &Did,
        created_at: i64,
        id: &MessageId,
        label: String,
    ) -> Result<(), AinpError> {
        let mut message = self
            .db
            .get_message(created_at, id)?
            .ok_or_else(|| AinpError::NotFound(format!("no message {}", id.as_str())))?;
        if !message.is_participant(caller) {
            return Err(AinpError::Forbidden);
        }
        message.labels.insert(label);
        self.db.update_message(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Router {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let discovery = DiscoveryIndex::new(db.clone());
        let push = Arc::new(PushRegistry::new(16));
        Router::new(db, discovery, push)
    }

    #[test]
    fn direct_message_is_persisted_and_inbox_scoped() {
        let router = setup();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        let intent = Intent::Message {
            conversation_id: None,
            subject: Some("hi".into()),
            body: "hello".into(),
        };
        router.route(&from, Some(&to), "e1", &intent, 100).unwrap();
        let inbox = router.inbox(&to, None, None, false, 50).unwrap();
        assert_eq!(inbox.len(), 1);
        let inbox_from_sender = router.inbox(&from, None, None, false, 50).unwrap();
        assert_eq!(inbox_from_sender.len(), 0);
    }

    #[test]
    fn routing_is_idempotent_on_envelope_id() {
        let router = setup();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        let intent = Intent::Message {
            conversation_id: None,
            subject: None,
            body: "hello".into(),
        };
        router.route(&from, Some(&to), "e1", &intent, 100).unwrap();
        router.route(&from, Some(&to), "e1", &intent, 100).unwrap();
        let inbox = router.inbox(&to, None, None, false, 50).unwrap();
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn thread_forbidden_for_non_participant() {
        let router = setup();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        let stranger = Did::new("did:key:zC");
        let intent = Intent::Message {
            conversation_id: Some("conv1".into()),
            subject: None,
            body: "hello".into(),
        };
        router.route(&from, Some(&to), "e1", &intent, 100).unwrap();
        let err = router
            .thread(&stranger, &ConversationId::new("conv1"))
            .unwrap_err();
        assert!(matches!(err, AinpError::Forbidden));
    }

    #[test]
    fn notification_intents_are_not_persisted() {
        let router = setup();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        let intent = Intent::Notification { body: "ping".into() };
        let outcome = router.route(&from, Some(&to), "e1", &intent, 100).unwrap();
        assert!(!outcome.persisted);
        assert_eq!(router.inbox(&to, None, None, false, 50).unwrap().len(), 0);
    }
}
