//! # Key Management
//!
//! secp256k1 keypairs for the signing identity.
//!
//! The ledger uses Ethereum-style accounts: the 20-byte address is the last
//! 20 bytes of the Keccak-256 of the uncompressed public key (without the
//! `0x04` prefix), and signatures are recoverable ECDSA so the signer can be
//! reconstructed from `(hash, r, s, v)` alone.
//!
//! Key bytes are never logged. `Debug` prints the address only.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use crate::config::RECOVERABLE_SIGNATURE_LENGTH;
use crate::crypto::hash::keccak256;
use crate::transaction::types::Address;

/// Secret key length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Errors that can occur during key operations.
///
/// Deliberately terse: error messages should not describe key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("ecdsa operation failed: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

/// A secp256k1 keypair.
///
/// Not `Serialize` on purpose; exporting a secret is an explicit call to
/// [`QkcKeypair::secret_key_bytes`].
#[derive(Clone)]
pub struct QkcKeypair {
    signing_key: SigningKey,
}

impl QkcKeypair {
    /// Fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuilds a keypair from a 32-byte big-endian secret scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let signing_key = SigningKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Rebuilds a keypair from hex, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let trimmed = hex_str.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes().into()
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Uncompressed SEC1 public key, `0x04 || x || y`.
    pub fn public_key_uncompressed(&self) -> Vec<u8> {
        self.verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        address_from_verifying_key(self.verifying_key())
    }

    /// Signs a 32-byte digest and returns `r || s || recovery_id`.
    ///
    /// Signatures are RFC 6979 deterministic and normalized to low-S, so the
    /// same key and digest always give the same bytes.
    pub fn sign_recoverable(
        &self,
        digest: &[u8; 32],
    ) -> Result<[u8; RECOVERABLE_SIGNATURE_LENGTH], KeyError> {
        let (signature, recovery_id) = self.signing_key.sign_prehash_recoverable(digest)?;
        let mut out = [0u8; RECOVERABLE_SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl fmt::Debug for QkcKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QkcKeypair(address={})", self.address())
    }
}

/// Address of the account behind a public key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}

/// Recovers the signer's public key from a digest, `r || s` and a raw
/// recovery id in `{0, 1}`.
pub fn recover_verifying_key(
    digest: &[u8; 32],
    rs: &[u8; 64],
    recovery_id: u8,
) -> Result<VerifyingKey, KeyError> {
    let signature = Signature::from_slice(rs).map_err(|_| KeyError::InvalidSignature)?;
    let recovery_id =
        RecoveryId::from_byte(recovery_id).ok_or(KeyError::InvalidRecoveryId(recovery_id))?;
    Ok(VerifyingKey::recover_from_prehash(
        digest,
        &signature,
        recovery_id,
    )?)
}
