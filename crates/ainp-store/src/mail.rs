use ainp_core::{AinpError, Contact, ConversationId, Did, MailCursor, Message, MessageId};

use crate::db::{de, ser, tree_get, tree_put, StoreDb};

impl StoreDb {
    /// Idempotent insert keyed by envelope/message id: a second insert with
    /// the same id is a no-op, giving exactly-once mailbox storage.
    pub fn put_message_if_absent(&self, message: &Message) -> Result<bool, AinpError> {
        let key = message_key(&message.created_at, &message.id);
        let existing = self
            .messages
            .get(&key)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        if existing.is_some() {
            return Ok(false);
        }
        self.messages
            .insert(key, ser(message)?)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(true)
    }

    pub fn update_message(&self, message: &Message) -> Result<(), AinpError> {
        let key = message_key(&message.created_at, &message.id);
        tree_put(&self.messages, &key, message)
    }

    pub fn get_message(&self, created_at: i64, id: &MessageId) -> Result<Option<Message>, AinpError> {
        tree_get(&self.messages, &message_key(&created_at, id))
    }

    /// Inbox listing for `owner`, newest-first, optionally after `cursor`.
    pub fn inbox_for(
        &self,
        owner: &Did,
        cursor: Option<&MailCursor>,
        label: Option<&str>,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Message>, AinpError> {
        let mut out = Vec::new();
        for entry in self.messages.iter().values().rev() {
            let bytes = entry.map_err(|e| AinpError::Storage(e.to_string()))?;
            let msg: Message = de(&bytes)?;
            if !msg.is_participant(owner) || &msg.to_did != owner {
                continue;
            }
            if let Some(cursor) = cursor {
                if (msg.created_at, msg.id.clone()) >= (cursor.timestamp, cursor.id.clone()) {
                    continue;
                }
            }
            if let Some(label) = label {
                if !msg.labels.contains(label) {
                    continue;
                }
            }
            if unread_only && msg.read {
                continue;
            }
            out.push(msg);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    pub fn thread(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, AinpError> {
        let mut out: Vec<Message> = self
            .messages
            .iter()
            .values()
            .map(|r| {
                let bytes = r.map_err(|e| AinpError::Storage(e.to_string()))?;
                de::<Message>(&bytes)
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    pub fn get_contact(&self, owner: &Did, peer: &Did) -> Result<Option<Contact>, AinpError> {
        tree_get(&self.contacts, &contact_key(owner, peer))
    }

    pub fn put_contact(&self, contact: &Contact) -> Result<(), AinpError> {
        tree_put(
            &self.contacts,
            &contact_key(&contact.owner_did, &contact.peer_did),
            contact,
        )
    }
}

fn message_key(created_at: &i64, id: &MessageId) -> Vec<u8> {
    let mut key = created_at.to_be_bytes().to_vec();
    key.extend_from_slice(id.as_str().as_bytes());
    key
}

fn contact_key(owner: &Did, peer: &Did) -> Vec<u8> {
    let mut key = owner.as_str().as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(peer.as_str().as_bytes());
    key
}
