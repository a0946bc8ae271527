use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::did::did_from_public_key;

/// An AINP keypair: an Ed25519 signing key plus its derived DID.
///
/// The secret key is held in a `Zeroizing` buffer to wipe memory on drop.
pub struct KeyPair {
    pub did: ainp_core::Did,
    pub public_key: VerifyingKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Generate a fresh Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key();
        let did = did_from_public_key(&public_key);
        KeyPair {
            did,
            public_key,
            secret_key: Zeroizing::new(signing_key.to_bytes()),
        }
    }

    /// Restore a keypair from raw secret key bytes (e.g. loaded from a
    /// wallet file).
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let public_key = signing_key.verifying_key();
        let did = did_from_public_key(&public_key);
        KeyPair {
            did,
            public_key,
            secret_key: Zeroizing::new(secret),
        }
    }

    /// Sign `message` using this keypair's secret key.
    pub fn sign(&self, message: &[u8]) -> ed25519_dalek::Signature {
        let signing_key = SigningKey::from_bytes(&self.secret_key);
        signing_key.sign(message)
    }

    pub fn secret_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ did: {:?} }}", self.did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = KeyPair::generate();
        let msg = b"hello ainp";
        let sig = kp.sign(msg);
        use ed25519_dalek::Verifier;
        assert!(kp.public_key.verify(msg, &sig).is_ok());
    }

    #[test]
    fn did_is_derived_from_public_key() {
        let kp = KeyPair::generate();
        let recovered = crate::did::public_key_of(kp.did.as_str()).unwrap();
        assert_eq!(recovered.as_bytes(), kp.public_key.as_bytes());
    }
}
