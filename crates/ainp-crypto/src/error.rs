use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed DID: {0}")]
    MalformedDid(String),

    #[error("signature verification failed")]
    SignatureMismatch,

    #[error("signature verification error: {0}")]
    VerificationError(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),
}

impl From<CryptoError> for ainp_core::AinpError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::MalformedDid(m) => ainp_core::AinpError::IdentityError(m),
            CryptoError::SignatureMismatch => ainp_core::AinpError::InvalidSignature,
            CryptoError::VerificationError(m) => {
                ainp_core::AinpError::SignatureVerificationError(m)
            }
            CryptoError::Canonicalization(m) => ainp_core::AinpError::InvalidEnvelope(m),
        }
    }
}
