use thiserror::Error;

/// Stable error kind string, as named in the error handling design.
///
/// These strings are part of the wire contract — they appear verbatim in
/// error response bodies and must not change independently of a protocol
/// version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidEnvelope,
    UnsupportedVersion,
    InvalidIntent,
    Unauthorized,
    InvalidSignature,
    SignatureVerificationError,
    Forbidden,
    NotFound,
    DuplicateEmail,
    ReplayDetected,
    Greylisted,
    RateLimitExceeded,
    PaymentRequired,
    QuorumNotMet,
    InsufficientFunds,
    MaxRoundsExceeded,
    NegotiationExpired,
    InvalidStateTransition,
    FeatureDisabled,
    IdentityError,
    InvalidRequest,
    InternalError,
}

impl ErrorKind {
    /// The stable wire string for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidEnvelope => "INVALID_ENVELOPE",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::InvalidIntent => "INVALID_INTENT",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::InvalidSignature => "INVALID_SIGNATURE",
            ErrorKind::SignatureVerificationError => "SIGNATURE_VERIFICATION_ERROR",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateEmail => "DUPLICATE_EMAIL",
            ErrorKind::ReplayDetected => "REPLAY_DETECTED",
            ErrorKind::Greylisted => "GREYLISTED",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::PaymentRequired => "PAYMENT_REQUIRED",
            ErrorKind::QuorumNotMet => "QUORUM_NOT_MET",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::MaxRoundsExceeded => "MAX_ROUNDS_EXCEEDED",
            ErrorKind::NegotiationExpired => "NEGOTIATION_EXPIRED",
            ErrorKind::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorKind::FeatureDisabled => "FEATURE_DISABLED",
            ErrorKind::IdentityError => "IDENTITY_ERROR",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Suggested HTTP status for this error kind, per the error handling design.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidEnvelope => 400,
            ErrorKind::UnsupportedVersion => 400,
            ErrorKind::InvalidIntent => 400,
            ErrorKind::InvalidRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::InvalidSignature => 401,
            ErrorKind::SignatureVerificationError => 401,
            ErrorKind::IdentityError => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateEmail => 409,
            ErrorKind::ReplayDetected => 409,
            ErrorKind::QuorumNotMet => 409,
            ErrorKind::InsufficientFunds => 409,
            ErrorKind::MaxRoundsExceeded => 409,
            ErrorKind::NegotiationExpired => 409,
            ErrorKind::InvalidStateTransition => 409,
            ErrorKind::PaymentRequired => 402,
            ErrorKind::Greylisted => 425,
            ErrorKind::RateLimitExceeded => 429,
            ErrorKind::FeatureDisabled => 503,
            ErrorKind::InternalError => 500,
        }
    }
}

/// The broker's unified error type.
///
/// Every component-local error eventually maps into one of these variants so
/// the admission surface has a single place to render an HTTP response.
#[derive(Debug, Error)]
pub enum AinpError {
    // ── Envelope pipeline ────────────────────────────────────────────────────
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("stale envelope: timestamp+ttl is in the past")]
    Stale,

    #[error("missing DID context")]
    Unauthorized,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signature verification error: {0}")]
    SignatureVerificationError(String),

    // ── ACL / lookup ─────────────────────────────────────────────────────────
    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    // ── Anti-fraud ───────────────────────────────────────────────────────────
    #[error("duplicate email content")]
    DuplicateEmail,

    #[error("replay detected")]
    ReplayDetected,

    #[error("greylisted, retry after {retry_after_seconds}s")]
    Greylisted { retry_after_seconds: u64 },

    #[error("rate limit exceeded")]
    RateLimitExceeded {
        retry_after_ms: u64,
        degraded: bool,
    },

    // ── Payments ─────────────────────────────────────────────────────────────
    #[error("payment required")]
    PaymentRequired {
        request_id: String,
        amount_atomic: u64,
        payment_url: String,
        expires_at: i64,
    },

    // ── Ledger ───────────────────────────────────────────────────────────────
    #[error("insufficient funds")]
    InsufficientFunds,

    // ── Negotiation ──────────────────────────────────────────────────────────
    #[error("max rounds exceeded")]
    MaxRoundsExceeded,

    #[error("negotiation expired")]
    NegotiationExpired,

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    // ── Receipts ─────────────────────────────────────────────────────────────
    #[error("quorum not met: {have} of {need}")]
    QuorumNotMet { have: usize, need: usize },

    // ── Identity ─────────────────────────────────────────────────────────────
    #[error("identity error: {0}")]
    IdentityError(String),

    // ── Configuration / feature flags ────────────────────────────────────────
    #[error("feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Storage / serialization / general ────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AinpError {
    /// The stable error-kind string for this error, used in response bodies.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AinpError::InvalidEnvelope(_) => ErrorKind::InvalidEnvelope,
            AinpError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            AinpError::InvalidIntent(_) => ErrorKind::InvalidIntent,
            AinpError::Stale => ErrorKind::InvalidEnvelope,
            AinpError::Unauthorized => ErrorKind::Unauthorized,
            AinpError::InvalidSignature => ErrorKind::InvalidSignature,
            AinpError::SignatureVerificationError(_) => ErrorKind::SignatureVerificationError,
            AinpError::Forbidden => ErrorKind::Forbidden,
            AinpError::NotFound(_) => ErrorKind::NotFound,
            AinpError::DuplicateEmail => ErrorKind::DuplicateEmail,
            AinpError::ReplayDetected => ErrorKind::ReplayDetected,
            AinpError::Greylisted { .. } => ErrorKind::Greylisted,
            AinpError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            AinpError::PaymentRequired { .. } => ErrorKind::PaymentRequired,
            AinpError::InsufficientFunds => ErrorKind::InsufficientFunds,
            AinpError::MaxRoundsExceeded => ErrorKind::MaxRoundsExceeded,
            AinpError::NegotiationExpired => ErrorKind::NegotiationExpired,
            AinpError::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            AinpError::QuorumNotMet { .. } => ErrorKind::QuorumNotMet,
            AinpError::IdentityError(_) => ErrorKind::IdentityError,
            AinpError::FeatureDisabled(_) => ErrorKind::FeatureDisabled,
            AinpError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AinpError::Storage(_) => ErrorKind::InternalError,
            AinpError::Serialization(_) => ErrorKind::InternalError,
            AinpError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

pub type AinpResult<T> = Result<T, AinpError>;
