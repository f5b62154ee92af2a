//! Value types shared by transactions and identities.
//!
//! Both are small `Copy` types; anything bigger lives on [`super::Transaction`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::fixed_width::{decode_fixed_u32, encode_fixed_u32, FixedWidthError};
use crate::config::{FIXED_WIDTH_LEN, SHARD_SIZE};

/// Length of an account address (recipient) in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced while parsing an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be {ADDRESS_LENGTH} bytes, got {0}")]
    WrongLength(usize),

    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address.
///
/// In a transaction this is the recipient; `Option<Address>` with `None`
/// signals contract creation, which is distinct from the all-zero address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Data transactions are sent here.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::WrongLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parses a hex address with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// FullShardKey
// ---------------------------------------------------------------------------

/// A 32-bit key locating an account or transaction on a shard.
///
/// The upper 16 bits are the chain id, the lower bits select the shard.
/// On the wire it always uses the fixed-width encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FullShardKey(pub u32);

impl FullShardKey {
    pub fn value(self) -> u32 {
        self.0
    }

    pub fn chain_id(self) -> u32 {
        self.0 >> 16
    }

    /// Full shard id of the shard this key maps to.
    pub fn full_shard_id(self) -> u32 {
        derive_full_shard_id(self.0)
    }

    pub fn encode_fixed(self) -> [u8; FIXED_WIDTH_LEN] {
        encode_fixed_u32(self.0)
    }

    pub fn decode_fixed(data: &[u8]) -> Result<Self, FixedWidthError> {
        decode_fixed_u32(data).map(Self)
    }
}

impl From<u32> for FullShardKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Maps a full shard key to its full shard id.
///
/// `(chain_id << 16) | shard_size | shard_id`. Only valid for a shard size of
/// one, where the shard id is always zero; larger shard counts need a real
/// mask and are not supported.
pub fn derive_full_shard_id(full_shard_key: u32) -> u32 {
    let chain_id = full_shard_key >> 16;
    let shard_id = full_shard_key & (SHARD_SIZE - 1);
    (chain_id << 16) | SHARD_SIZE | shard_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_shard_id_of_default_key() {
        assert_eq!(derive_full_shard_id(262_145), 262_145);
        assert_eq!(FullShardKey(262_145).chain_id(), 4);
    }

    #[test]
    fn full_shard_id_ignores_low_bits() {
        assert_eq!(derive_full_shard_id(0x0004_0000), 0x0004_0001);
        assert_eq!(derive_full_shard_id(0x0004_abcd), 0x0004_0001);
        assert_eq!(derive_full_shard_id(0), 1);
    }

    #[test]
    fn shard_key_fixed_width_roundtrip() {
        let key = FullShardKey(0x0004_0001);
        let enc = key.encode_fixed();
        assert_eq!(enc, [0x84, 0x00, 0x04, 0x00, 0x01]);
        assert_eq!(FullShardKey::decode_fixed(&enc), Ok(key));
    }

    #[test]
    fn address_hex_parsing() {
        let hex = "0x00000000000000000000000000000000000000ff";
        let addr = Address::from_hex(hex).unwrap();
        assert_eq!(addr.as_bytes()[19], 0xff);
        assert_eq!(addr.to_hex(), hex);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), addr);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert_eq!(
            Address::from_slice(&[0u8; 19]),
            Err(AddressError::WrongLength(19))
        );
        assert!(matches!(
            Address::from_hex("0xzz"),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn zero_address_is_default() {
        assert_eq!(Address::default(), Address::ZERO);
        assert_eq!(Address::ZERO.to_string(), format!("0x{}", "0".repeat(40)));
    }
}
