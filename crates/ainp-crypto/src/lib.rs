pub mod canonical;
pub mod did;
pub mod error;
pub mod keypair;
pub mod sign;

pub use canonical::canonicalize;
pub use did::{did_from_public_key, public_key_of};
pub use error::CryptoError;
pub use keypair::KeyPair;
pub use sign::{sign_envelope, verify_envelope};
