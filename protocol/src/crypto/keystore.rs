//! # Private Key Keystore
//!
//! Password protection for the signing key at rest. The service is started
//! with an encrypted key blob plus a password instead of a raw key.
//!
//! - The AES-256 key is `SHA-256(password)`.
//! - The cipher is AES-256-GCM with a random 96-bit nonce.
//! - The blob is `hex(nonce || ciphertext || tag)`.
//!
//! GCM authenticates the ciphertext, so a wrong password fails loudly
//! instead of yielding a garbage key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::crypto::hash::sha256;

/// AES-256-GCM nonce length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Errors that can occur while sealing or opening a key blob.
///
/// Decryption failures are not split into "wrong password" and "corrupted
/// blob"; the two are indistinguishable to GCM anyway.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong password or corrupted key blob")]
    DecryptFailed,

    #[error("key blob is not valid hex")]
    InvalidHex,

    #[error("key blob too short: must be at least {} bytes", AES_NONCE_LENGTH + AES_TAG_LENGTH)]
    BlobTooShort,

    #[error("decrypted key is not valid UTF-8")]
    InvalidUtf8,
}

fn derive_key(password: &str) -> Result<Aes256Gcm, KeystoreError> {
    if password.is_empty() {
        return Err(KeystoreError::EmptyPassword);
    }
    let key = sha256(password.as_bytes());
    Aes256Gcm::new_from_slice(&key).map_err(|_| KeystoreError::EncryptFailed)
}

/// Encrypts a hex private key under `password`, returning the hex blob.
pub fn encrypt_private_key(private_key: &str, password: &str) -> Result<String, KeystoreError> {
    let cipher = derive_key(password)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, private_key.as_bytes())
        .map_err(|_| KeystoreError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(hex::encode(out))
}

/// Opens a blob produced by [`encrypt_private_key`].
pub fn decrypt_private_key(blob: &str, password: &str) -> Result<String, KeystoreError> {
    let cipher = derive_key(password)?;

    let blob = blob.trim();
    let data = hex::decode(blob.strip_prefix("0x").unwrap_or(blob))
        .map_err(|_| KeystoreError::InvalidHex)?;
    if data.len() < AES_NONCE_LENGTH + AES_TAG_LENGTH {
        return Err(KeystoreError::BlobTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| KeystoreError::DecryptFailed)?;

    String::from_utf8(plaintext).map_err(|_| KeystoreError::InvalidUtf8)
}

/// Resolves the key the service should sign with.
///
/// Without a password the input already is the raw key; with one it is a
/// keystore blob.
pub fn resolve_private_key(input: &str, password: Option<&str>) -> Result<String, KeystoreError> {
    match password {
        None | Some("") => Ok(input.trim().to_string()),
        Some(pw) => decrypt_private_key(input, pw),
    }
}
