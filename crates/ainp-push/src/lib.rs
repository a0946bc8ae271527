//! Push delivery (C10): best-effort live notification fan-out per recipient
//! DID, independent of and never blocking durable mailbox persistence (C6).
//!
//! Each recipient gets a bounded broadcast channel. A live subscriber (a
//! WebSocket connection) receives messages in FIFO order; once the channel
//! is full, the oldest unconsumed entry is dropped in favor of the newest —
//! tokio's broadcast channel does this natively, so a slow or disconnected
//! subscriber never backpressures a sender.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ainp_core::{Did, Message};
use tokio::sync::broadcast;

/// A single pushed notification. Carries the full message so a connected
/// subscriber doesn't need a follow-up mailbox fetch for the common case.
#[derive(Debug, Clone)]
pub struct PushNotification {
    pub message: Arc<Message>,
}

pub struct PushRegistry {
    channels: Mutex<HashMap<Did, broadcast::Sender<PushNotification>>>,
    queue_depth: usize,
}

impl PushRegistry {
    pub fn new(queue_depth: usize) -> Self {
        PushRegistry {
            channels: Mutex::new(HashMap::new()),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Subscribe to `did`'s push channel, creating it if this is the first
    /// subscriber. Multiple concurrent subscribers (e.g. multi-device) each
    /// get their own receiver and see every notification.
    pub fn subscribe(&self, did: &Did) -> broadcast::Receiver<PushNotification> {
        let mut channels = self.channels.lock().unwrap();
        match channels.get(did) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(self.queue_depth);
                channels.insert(did.clone(), tx);
                rx
            }
        }
    }

    /// Best-effort publish. Returns `true` if at least one subscriber was
    /// live to receive it; `false` (not an error) if nobody was listening —
    /// the message is already durable in the mailbox by the time this runs.
    pub fn publish(&self, did: &Did, message: Arc<Message>) -> bool {
        let channels = self.channels.lock().unwrap();
        match channels.get(did) {
            Some(tx) => tx.send(PushNotification { message }).is_ok(),
            None => false,
        }
    }

    /// Drop a recipient's channel once it has no subscribers, so the
    /// registry doesn't grow unbounded over agent churn.
    pub fn prune_idle(&self, did: &Did) {
        let mut channels = self.channels.lock().unwrap();
        if let Some(tx) = channels.get(did) {
            if tx.receiver_count() == 0 {
                channels.remove(did);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{ConversationId, MessageId};

    fn sample_message(id: &str) -> Arc<Message> {
        Arc::new(Message {
            id: MessageId::new(id),
            conversation_id: ConversationId::new("c1"),
            from_did: Did::new("did:key:zSender"),
            to_did: Did::new("did:key:zOwner"),
            subject: None,
            body: "hi".into(),
            labels: Default::default(),
            read: false,
            attachments: vec![],
            created_at: 0,
        })
    }

    #[tokio::test]
    async fn subscribe_then_publish_delivers() {
        let registry = PushRegistry::new(16);
        let owner = Did::new("did:key:zOwner");
        let mut rx = registry.subscribe(&owner);
        assert!(registry.publish(&owner, sample_message("m1")));
        let notif = rx.recv().await.unwrap();
        assert_eq!(notif.message.id.as_str(), "m1");
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_not_an_error() {
        let registry = PushRegistry::new(16);
        let owner = Did::new("did:key:zOwner");
        assert!(!registry.publish(&owner, sample_message("m1")));
    }

    #[tokio::test]
    async fn overflow_drops_oldest_for_a_lagging_subscriber() {
        let registry = PushRegistry::new(2);
        let owner = Did::new("did:key:zOwner");
        let mut rx = registry.subscribe(&owner);
        registry.publish(&owner, sample_message("m1"));
        registry.publish(&owner, sample_message("m2"));
        registry.publish(&owner, sample_message("m3"));
        // m1 was evicted; the subscriber observes a lag then resumes at m2.
        let first = rx.recv().await;
        assert!(matches!(first, Err(broadcast::error::RecvError::Lagged(_))));
        let m2 = rx.recv().await.unwrap();
        assert_eq!(m2.message.id.as_str(), "m2");
        let m3 = rx.recv().await.unwrap();
        assert_eq!(m3.message.id.as_str(), "m3");
    }

    #[tokio::test]
    async fn prune_idle_removes_channel_with_no_subscribers() {
        let registry = PushRegistry::new(16);
        let owner = Did::new("did:key:zOwner");
        {
            let _rx = registry.subscribe(&owner);
        }
        registry.prune_idle(&owner);
        // After pruning, publishing finds no channel at all.
        assert!(!registry.publish(&owner, sample_message("m1")));
    }
}
