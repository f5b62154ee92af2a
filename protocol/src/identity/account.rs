//! The signing identity: one private key, one shard-bound address.

use std::fmt;

use crate::crypto::keys::{KeyError, QkcKeypair};
use crate::identity::qkc_address::QkcAddress;
use crate::transaction::types::FullShardKey;

/// The key and address a service instance signs and queries with.
///
/// Immutable once built. Cloning copies the secret, so share it behind an
/// `Arc` instead.
#[derive(Clone)]
pub struct SigningIdentity {
    keypair: QkcKeypair,
    address: QkcAddress,
}

impl SigningIdentity {
    /// Binds `keypair` to the account on `full_shard_key`.
    pub fn new(keypair: QkcKeypair, full_shard_key: impl Into<FullShardKey>) -> Self {
        let address = QkcAddress::new(keypair.address(), full_shard_key);
        Self { keypair, address }
    }

    /// Loads the identity from a hex secret key.
    pub fn from_hex(
        private_key: &str,
        full_shard_key: impl Into<FullShardKey>,
    ) -> Result<Self, KeyError> {
        Ok(Self::new(QkcKeypair::from_hex(private_key)?, full_shard_key))
    }

    pub fn keypair(&self) -> &QkcKeypair {
        &self.keypair
    }

    pub fn address(&self) -> QkcAddress {
        self.address
    }

    pub fn full_shard_key(&self) -> FullShardKey {
        self.address.full_shard_key
    }

    /// Full shard id whose account state holds this identity's nonce and balances.
    pub fn full_shard_id(&self) -> u32 {
        self.address.full_shard_key.full_shard_id()
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningIdentity(address={})", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn binds_address_to_shard() {
        let id = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        assert_eq!(
            id.address().to_hex(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c2300040001"
        );
        assert_eq!(id.full_shard_id(), 262_145);
        assert_eq!(id.full_shard_key(), FullShardKey(262_145));
    }

    #[test]
    fn debug_shows_address_only() {
        let id = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        let dbg = format!("{id:?}");
        assert!(dbg.starts_with("SigningIdentity(address=0x2c7536e3"));
        assert!(!dbg.contains("4c0883a6"));
    }

    #[test]
    fn invalid_key_is_an_error() {
        assert!(SigningIdentity::from_hex("0x00", 1u32).is_err());
    }
}
