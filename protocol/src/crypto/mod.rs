//! # Cryptographic Primitives
//!
//! Everything the signing identity needs, as thin wrappers over audited
//! RustCrypto implementations:
//!
//! - **secp256k1 ECDSA** (`k256`) for recoverable transaction signatures.
//! - **Keccak-256** (`sha3`) for signing hashes and address derivation.
//! - **AES-256-GCM** (`aes-gcm`) with a SHA-256 password key for the keystore.

pub mod hash;
pub mod keys;
pub mod keystore;

pub use hash::{keccak256, sha256};
pub use keys::{KeyError, QkcKeypair};
pub use keystore::{decrypt_private_key, encrypt_private_key, KeystoreError};
