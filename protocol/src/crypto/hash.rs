//! # Hashing Utilities
//!
//! Two hash functions, each with one job:
//!
//! - **Keccak-256**: the ledger's hash. Transaction signing hashes,
//!   transaction ids and address derivation all use it. Note this is the
//!   original Keccak padding, not the finalized SHA3-256.
//! - **SHA-256**: key derivation for the keystore password.

use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`.
///
/// # Example
///
/// ```
/// use qkc_protocol::crypto::keccak256;
///
/// let hash = keccak256(b"");
/// assert_eq!(
///     hex::encode(hash),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn keccak_is_not_sha3() {
        // SHA3-256("") starts with a7ffc6f8; Keccak-256("") with c5d24601.
        assert_eq!(hex::encode(&keccak256(b"")[..4]), "c5d24601");
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
