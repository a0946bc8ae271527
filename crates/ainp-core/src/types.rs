use serde::{Deserialize, Serialize};
use std::fmt;

/// A self-certifying decentralized identifier, `did:key:z...`.
///
/// The DID embeds its controller's Ed25519 public key; callers MUST derive
/// the public key from the DID string itself (see `ainp_crypto::did`) rather
/// than trust one supplied out-of-band.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Did(String);

impl Did {
    pub fn new(s: impl Into<String>) -> Self {
        Did(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0;
        if s.len() > 16 {
            write!(f, "Did({}…)", &s[..16])
        } else {
            write!(f, "Did({s})")
        }
    }
}

impl From<String> for Did {
    fn from(s: String) -> Self {
        Did(s)
    }
}

impl From<&str> for Did {
    fn from(s: &str) -> Self {
        Did(s.to_string())
    }
}

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn generate() -> Self {
                $name(uuid_like())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(EnvelopeId);
string_id!(TraceId);
string_id!(MessageId);
string_id!(ConversationId);
string_id!(SessionId);
string_id!(ReceiptId);
string_id!(AttestationId);
string_id!(CapabilityId);
string_id!(TransactionId);

/// Credit amount in atomic units (smallest integer unit of the ledger).
pub type AtomicAmount = u64;

/// Generate a random, URL-safe identifier without pulling in a UUID crate.
///
/// Uses 16 random bytes hex-encoded, which is more than sufficient entropy
/// for an opaque internal identifier (not a security-sensitive secret).
fn uuid_like() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
