use ed25519_dalek::VerifyingKey;

use ainp_core::Did;

use crate::error::CryptoError;

/// Multicodec prefix for Ed25519 public keys (varint `0xed01`), per the
/// `did:key` method spec.
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

const DID_KEY_PREFIX: &str = "did:key:z";

/// Derive a `did:key:z...` string from an Ed25519 public key.
pub fn did_from_public_key(public_key: &VerifyingKey) -> Did {
    let mut buf = Vec::with_capacity(2 + 32);
    buf.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
    buf.extend_from_slice(public_key.as_bytes());
    let encoded = bs58::encode(buf).into_string();
    Did::new(format!("{DID_KEY_PREFIX}{encoded}"))
}

/// Recover the Ed25519 public key embedded in a DID string.
///
/// The identifier is self-certifying: callers MUST derive the public key
/// this way rather than accept one supplied out-of-band by a caller.
pub fn public_key_of(did: &str) -> Result<VerifyingKey, CryptoError> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| CryptoError::MalformedDid(did.to_string()))?;

    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::MalformedDid(format!("bad base58btc: {e}")))?;

    if bytes.len() != 34 || bytes[0..2] != ED25519_MULTICODEC_PREFIX {
        return Err(CryptoError::MalformedDid(format!(
            "expected 34-byte ed25519 multicodec payload, got {} bytes",
            bytes.len()
        )));
    }

    let key_bytes: [u8; 32] = bytes[2..34]
        .try_into()
        .map_err(|_| CryptoError::MalformedDid("bad public key length".into()))?;

    VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::MalformedDid(format!("invalid ed25519 point: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn round_trips_through_did_string() {
        let kp = KeyPair::generate();
        let recovered = public_key_of(kp.did.as_str()).unwrap();
        assert_eq!(recovered.as_bytes(), kp.public_key.as_bytes());
    }

    #[test]
    fn rejects_malformed_prefix() {
        let err = public_key_of("did:web:example.com").unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDid(_)));
    }

    #[test]
    fn rejects_wrong_length() {
        let short = format!("did:key:z{}", bs58::encode([0xed, 0x01, 0x02]).into_string());
        let err = public_key_of(&short).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDid(_)));
    }
}
