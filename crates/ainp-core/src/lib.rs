pub mod agent;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod ledger;
pub mod mail;
pub mod negotiation;
pub mod receipt;
pub mod reputation;
pub mod types;

pub use agent::{Agent, Capability, TrustVector, UsefulnessScore};
pub use envelope::{Envelope, Intent, MsgType};
pub use error::{AinpError, AinpResult, ErrorKind};
pub use ledger::{CreditAccount, CreditTransaction, TransactionType};
pub use mail::{Contact, ContactState, MailCursor, Message};
pub use negotiation::{IncentiveSplit, NegotiationSession, NegotiationState, Proposal, Round};
pub use receipt::{Attestation, AttestationType, ReceiptMetrics, ReceiptStatus, TaskReceipt};
pub use reputation::{ewma_update, AgentReputation};
pub use types::{
    AtomicAmount, AttestationId, CapabilityId, ConversationId, Did, EnvelopeId, MessageId,
    ReceiptId, SessionId, TraceId, TransactionId,
};
