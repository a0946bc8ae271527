use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use ainp_core::Envelope;

use crate::canonical::canonicalize;
use crate::did::public_key_of;
use crate::error::CryptoError;
use crate::keypair::KeyPair;

/// Sign a canonicalized-without-`sig` envelope, returning the base64 signature
/// to place into the envelope's `sig` field.
pub fn sign_envelope(envelope: &Envelope, keypair: &KeyPair) -> String {
    let bytes = canonicalize(&envelope.signing_view());
    let sig = keypair.sign(&bytes);
    STANDARD.encode(sig.to_bytes())
}

/// Verify an envelope's signature. The public key is derived from `from_did`,
/// never trusted out-of-band, per the self-certifying identity model.
pub fn verify_envelope(envelope: &Envelope) -> Result<(), CryptoError> {
    let public_key = public_key_of(envelope.from_did.as_str())?;
    let sig_bytes = STANDARD
        .decode(&envelope.sig)
        .map_err(|e| CryptoError::VerificationError(format!("bad base64 signature: {e}")))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::VerificationError("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let bytes = canonicalize(&envelope.signing_view());
    verify_bytes(&public_key, &bytes, &signature)
}

fn verify_bytes(
    public_key: &VerifyingKey,
    bytes: &[u8],
    signature: &Signature,
) -> Result<(), CryptoError> {
    public_key
        .verify(bytes, signature)
        .map_err(|_| CryptoError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{EnvelopeId, MsgType, TraceId};

    fn sample_envelope(from: &KeyPair) -> Envelope {
        Envelope {
            id: EnvelopeId::new("e1"),
            trace_id: TraceId::new("t1"),
            from_did: from.did.clone(),
            to_did: None,
            msg_type: MsgType::Intent,
            version: Some(1),
            ttl_ms: 60_000,
            timestamp_ms: 1_700_000_000_000,
            sig: String::new(),
            payload: serde_json::json!({"@type": "NOTIFICATION", "body": "hi"}),
        }
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let kp = KeyPair::generate();
        let mut env = sample_envelope(&kp);
        env.sig = sign_envelope(&env, &kp);
        assert!(verify_envelope(&env).is_ok());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let kp = KeyPair::generate();
        let mut env = sample_envelope(&kp);
        env.sig = sign_envelope(&env, &kp);
        env.payload = serde_json::json!({"@type": "NOTIFICATION", "body": "tampered"});
        assert!(verify_envelope(&env).is_err());
    }

    #[test]
    fn wrong_signer_fails_verification() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let mut env = sample_envelope(&kp);
        env.sig = sign_envelope(&env, &other);
        assert!(verify_envelope(&env).is_err());
    }
}
