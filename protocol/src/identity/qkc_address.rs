//! # QKC Addresses
//!
//! A QKC address is an account address qualified by the shard it lives on:
//!
//! ```text
//! recipient (20 bytes) || full_shard_key (4 bytes, big-endian)
//!     -> "0x" + 48 hex characters
//! ```
//!
//! The ledger's `getAccountData` takes this 24-byte form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::transaction::types::{Address, FullShardKey, ADDRESS_LENGTH};

/// Byte length of a serialized QKC address.
pub const QKC_ADDRESS_LENGTH: usize = ADDRESS_LENGTH + 4;

/// Errors that can occur while parsing a [`QkcAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QkcAddressError {
    #[error("QKC address is not valid hex: {0}")]
    InvalidHex(String),

    #[error("invalid QKC address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// An account address bound to a full shard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QkcAddress {
    pub recipient: Address,
    pub full_shard_key: FullShardKey,
}

impl QkcAddress {
    pub fn new(recipient: Address, full_shard_key: impl Into<FullShardKey>) -> Self {
        Self {
            recipient,
            full_shard_key: full_shard_key.into(),
        }
    }

    pub fn to_bytes(&self) -> [u8; QKC_ADDRESS_LENGTH] {
        let mut out = [0u8; QKC_ADDRESS_LENGTH];
        out[..ADDRESS_LENGTH].copy_from_slice(self.recipient.as_bytes());
        out[ADDRESS_LENGTH..].copy_from_slice(&self.full_shard_key.value().to_be_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parses the `0x`-prefixed (or bare) 48-character form.
    pub fn from_hex(s: &str) -> Result<Self, QkcAddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| QkcAddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != QKC_ADDRESS_LENGTH {
            return Err(QkcAddressError::InvalidLength {
                expected: QKC_ADDRESS_LENGTH,
                got: bytes.len(),
            });
        }
        let mut recipient = [0u8; ADDRESS_LENGTH];
        recipient.copy_from_slice(&bytes[..ADDRESS_LENGTH]);
        let mut key = [0u8; 4];
        key.copy_from_slice(&bytes[ADDRESS_LENGTH..]);
        Ok(Self::new(Address::new(recipient), u32::from_be_bytes(key)))
    }
}

impl fmt::Display for QkcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
