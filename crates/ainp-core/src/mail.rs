use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{ConversationId, Did, MessageId};

/// A durable mailbox message, persisted when an intent represents a
/// persistent message and is routed to a direct recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub from_did: Did,
    pub to_did: Did,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: i64,
}

impl Message {
    /// Participants recorded for ACL purposes: the union of sender and
    /// recipient.
    pub fn participants(&self) -> [&Did; 2] {
        [&self.from_did, &self.to_did]
    }

    pub fn is_participant(&self, did: &Did) -> bool {
        &self.from_did == did || &self.to_did == did
    }
}

/// Contact state between an owner and a peer, used by anti-fraud greylisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactState {
    Unknown,
    Greylisted,
    Allowlisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub owner_did: Did,
    pub peer_did: Did,
    pub state: ContactState,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// An opaque, cursor-based pagination token for mailbox listings. Stable
/// over concurrent inserts because it orders by `(timestamp, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailCursor {
    pub timestamp: i64,
    pub id: MessageId,
}

impl MailCursor {
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.timestamp, self.id.as_str());
        bs58::encode(raw.as_bytes()).into_string()
    }

    pub fn decode(s: &str) -> Option<Self> {
        let bytes = bs58::decode(s).into_vec().ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        let (ts, id) = raw.split_once(':')?;
        Some(MailCursor {
            timestamp: ts.parse().ok()?,
            id: MessageId::new(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let c = MailCursor {
            timestamp: 1234567,
            id: MessageId::new("abc123"),
        };
        let encoded = c.encode();
        let decoded = MailCursor::decode(&encoded).unwrap();
        assert_eq!(decoded.timestamp, c.timestamp);
        assert_eq!(decoded.id, c.id);
    }

    #[test]
    fn message_participants_include_sender_and_recipient() {
        let msg = Message {
            id: MessageId::new("m1"),
            conversation_id: ConversationId::new("c1"),
            from_did: Did::new("did:key:zA"),
            to_did: Did::new("did:key:zB"),
            subject: None,
            body: "hi".into(),
            labels: Default::default(),
            read: false,
            attachments: vec![],
            created_at: 0,
        };
        assert!(msg.is_participant(&Did::new("did:key:zA")));
        assert!(msg.is_participant(&Did::new("did:key:zB")));
        assert!(!msg.is_participant(&Did::new("did:key:zC")));
    }
}
