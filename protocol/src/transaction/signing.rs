//! Transaction signing with secp256k1 recoverable signatures.
//!
//! Signing is a separate step from building and never touches its input: it
//! returns a new [`Transaction`] carrying `v`, `r` and `s`. The signed digest
//! is the Keccak-256 of [`Transaction::signing_payload`], which excludes the
//! version and the signature fields.

use num_bigint::BigUint;
use thiserror::Error;

use super::builder::Transaction;
use super::types::Address;
use crate::config::{RECOVERABLE_SIGNATURE_LENGTH, RECOVERY_ID_OFFSET};
use crate::crypto::keys::{address_from_verifying_key, recover_verifying_key, KeyError};
use crate::identity::SigningIdentity;

/// Errors from signing or signer recovery.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing primitive failed: {0}")]
    Primitive(#[from] KeyError),

    #[error("transaction is not signed")]
    Unsigned,

    #[error("invalid v value {0}: expected 27 or 28")]
    InvalidV(BigUint),

    #[error("signature component `{0}` does not fit in 32 bytes")]
    ComponentTooLarge(&'static str),
}

/// Signs `tx` with the identity's key.
///
/// Returns a copy of `tx` with the signature set; `tx` itself is unchanged.
/// Signing is deterministic, so the same identity and transaction always
/// give the same result.
///
/// # Example
///
/// ```
/// use qkc_protocol::identity::SigningIdentity;
/// use qkc_protocol::transaction::{recover_signer, sign_transaction, Address, TransactionBuilder};
///
/// let identity = SigningIdentity::from_hex(
///     "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
///     262_145u32,
/// )
/// .unwrap();
/// let tx = TransactionBuilder::new()
///     .nonce(1)
///     .recipient(Address::ZERO)
///     .full_shard_keys(identity.full_shard_key())
///     .build();
///
/// let signed = sign_transaction(&tx, &identity).unwrap();
/// assert!(signed.is_signed());
/// assert!(!tx.is_signed());
/// assert_eq!(recover_signer(&signed).unwrap(), identity.address().recipient);
/// ```
pub fn sign_transaction(
    tx: &Transaction,
    identity: &SigningIdentity,
) -> Result<Transaction, SigningError> {
    let digest = tx.signing_hash();
    let signature = identity.keypair().sign_recoverable(&digest)?;
    Ok(tx.with_signature(&signature))
}

/// Splits a 65-byte recoverable signature into `(r, s, v)`.
///
/// `v` is the raw recovery id plus 27.
///
/// # Panics
///
/// Panics if `signature` is not exactly 65 bytes long; signatures only come
/// from the signer, so a wrong length is a programming error.
pub fn signature_values(signature: &[u8]) -> (BigUint, BigUint, BigUint) {
    assert_eq!(
        signature.len(),
        RECOVERABLE_SIGNATURE_LENGTH,
        "wrong size for signature: got {}, want {}",
        signature.len(),
        RECOVERABLE_SIGNATURE_LENGTH
    );
    let r = BigUint::from_bytes_be(&signature[..32]);
    let s = BigUint::from_bytes_be(&signature[32..64]);
    let v = BigUint::from(signature[64]) + BigUint::from(RECOVERY_ID_OFFSET);
    (r, s, v)
}

impl Transaction {
    /// A copy of this transaction carrying the given 65-byte signature.
    ///
    /// # Panics
    ///
    /// Same as [`signature_values`].
    pub fn with_signature(&self, signature: &[u8]) -> Transaction {
        let (r, s, v) = signature_values(signature);
        self.with_signature_values(v, r, s)
    }
}

/// Recovers the address that signed `tx`.
pub fn recover_signer(tx: &Transaction) -> Result<Address, SigningError> {
    if !tx.is_signed() {
        return Err(SigningError::Unsigned);
    }
    let (v, r, s) = tx.signature();

    let recovery_id = v
        .to_u32_digits()
        .first()
        .copied()
        .filter(|_| v.bits() <= 8)
        .and_then(|v| v.checked_sub(u32::from(RECOVERY_ID_OFFSET)))
        .filter(|id| *id <= 1)
        .ok_or_else(|| SigningError::InvalidV(v.clone()))?;

    let mut rs = [0u8; 64];
    write_component(&mut rs[..32], r, "r")?;
    write_component(&mut rs[32..], s, "s")?;

    let key = recover_verifying_key(&tx.signing_hash(), &rs, recovery_id as u8)?;
    Ok(address_from_verifying_key(&key))
}

fn write_component(out: &mut [u8], value: &BigUint, name: &'static str) -> Result<(), SigningError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > out.len() {
        return Err(SigningError::ComponentTooLarge(name));
    }
    let start = out.len() - bytes.len();
    out[start..].copy_from_slice(&bytes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
