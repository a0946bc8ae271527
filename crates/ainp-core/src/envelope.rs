use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Did, EnvelopeId, TraceId};

/// Top-level envelope message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MsgType {
    Intent,
    Result,
    Error,
    Negotiate,
    Ack,
}

/// The signed outer record carrying a payload between agents.
///
/// Transient on ingress: an envelope is validated and routed by the pipeline,
/// not itself the durable record (a `Message` is persisted for mailbox
/// delivery when applicable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub trace_id: TraceId,
    pub from_did: Did,
    #[serde(default)]
    pub to_did: Option<Did>,
    pub msg_type: MsgType,
    /// Protocol version; absent means "assume supported".
    #[serde(default)]
    pub version: Option<u32>,
    pub ttl_ms: i64,
    pub timestamp_ms: i64,
    /// base64(Ed25519 signature) over the canonicalized envelope with `sig` removed.
    pub sig: String,
    pub payload: Value,
}

impl Envelope {
    /// Returns this envelope as a JSON value with `sig` removed, ready for
    /// canonicalization prior to signing or verification.
    pub fn signing_view(&self) -> Value {
        let mut v = serde_json::to_value(self).expect("Envelope always serializes");
        if let Some(obj) = v.as_object_mut() {
            obj.remove("sig");
        }
        v
    }

    pub fn is_expired(&self, now_ms: i64, skew_ms: i64) -> bool {
        self.timestamp_ms + self.ttl_ms + skew_ms < now_ms
    }
}

/// A semantic action payload, tagged by `@type`.
///
/// Unknown `@type` values MUST be rejected with `INVALID_INTENT`, never
/// silently accepted — there is deliberately no default/catch-all arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Intent {
    #[serde(rename = "EMAIL_MESSAGE")]
    EmailMessage {
        subject: Option<String>,
        body: String,
    },
    #[serde(rename = "MESSAGE")]
    Message {
        conversation_id: Option<String>,
        subject: Option<String>,
        body: String,
    },
    #[serde(rename = "TASK_REQUEST")]
    TaskRequest {
        description: String,
        embedding: Option<Vec<f32>>,
    },
    #[serde(rename = "NOTIFICATION")]
    Notification { body: String },
}

impl Intent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Intent::EmailMessage { .. } => "EMAIL_MESSAGE",
            Intent::Message { .. } => "MESSAGE",
            Intent::TaskRequest { .. } => "TASK_REQUEST",
            Intent::Notification { .. } => "NOTIFICATION",
        }
    }

    /// Whether this intent represents a persistent, mailbox-worthy message.
    pub fn is_persistent_message(&self) -> bool {
        matches!(self, Intent::EmailMessage { .. } | Intent::Message { .. })
    }

    /// Whether this intent is subject to the email-flavored anti-fraud guards
    /// (content dedupe, greylist, postage).
    pub fn is_email_flavored(&self) -> bool {
        matches!(self, Intent::EmailMessage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_intent_type_fails_to_parse() {
        let raw = serde_json::json!({"@type": "WIRE_TRANSFER", "body": "x"});
        let parsed: Result<Intent, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn email_message_is_persistent_and_email_flavored() {
        let intent = Intent::EmailMessage {
            subject: Some("Hello".into()),
            body: "hi".into(),
        };
        assert!(intent.is_persistent_message());
        assert!(intent.is_email_flavored());
    }

    #[test]
    fn signing_view_drops_sig() {
        let env = Envelope {
            id: EnvelopeId::new("e1"),
            trace_id: TraceId::new("t1"),
            from_did: Did::new("did:key:zExample"),
            to_did: None,
            msg_type: MsgType::Intent,
            version: Some(1),
            ttl_ms: 60_000,
            timestamp_ms: 0,
            sig: "deadbeef".into(),
            payload: serde_json::json!({"@type": "NOTIFICATION", "body": "x"}),
        };
        let v = env.signing_view();
        assert!(v.get("sig").is_none());
        assert_eq!(v.get("id").unwrap(), "e1");
    }
}
