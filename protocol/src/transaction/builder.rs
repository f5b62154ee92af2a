//! Transaction construction via the builder pattern.
//!
//! [`TransactionBuilder`] assembles an unsigned [`Transaction`]. Signing
//! happens in [`super::signing`] and never mutates the builder's output; it
//! returns a new record that differs only in `v`, `r` and `s`.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::types::{Address, FullShardKey};
use crate::config::TX_VERSION;
use crate::crypto::hash::keccak256;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An EVM-style transaction on a sharded ledger.
///
/// Immutable once built. The wire encoding and field order are described in
/// [`super::encoding`].
///
/// A transaction is unsigned iff `v`, `r` and `s` are all zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub(crate) nonce: u64,
    pub(crate) gas_price: BigUint,
    #[serde(rename = "gas")]
    pub(crate) gas_limit: u64,
    /// `None` means contract creation.
    #[serde(rename = "to")]
    pub(crate) recipient: Option<Address>,
    #[serde(rename = "value")]
    pub(crate) amount: BigUint,
    #[serde(rename = "data")]
    pub(crate) payload: Vec<u8>,
    pub(crate) network_id: u32,
    pub(crate) from_full_shard_key: FullShardKey,
    pub(crate) to_full_shard_key: FullShardKey,
    pub(crate) gas_token_id: u64,
    pub(crate) transfer_token_id: u64,
    pub(crate) version: u32,
    pub(crate) v: BigUint,
    pub(crate) r: BigUint,
    pub(crate) s: BigUint,
}

impl Transaction {
    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::new()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn gas_price(&self) -> &BigUint {
        &self.gas_price
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn recipient(&self) -> Option<Address> {
        self.recipient
    }

    pub fn amount(&self) -> &BigUint {
        &self.amount
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn from_full_shard_key(&self) -> FullShardKey {
        self.from_full_shard_key
    }

    pub fn to_full_shard_key(&self) -> FullShardKey {
        self.to_full_shard_key
    }

    pub fn gas_token_id(&self) -> u64 {
        self.gas_token_id
    }

    pub fn transfer_token_id(&self) -> u64 {
        self.transfer_token_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Signature components as `(v, r, s)`.
    pub fn signature(&self) -> (&BigUint, &BigUint, &BigUint) {
        (&self.v, &self.r, &self.s)
    }

    pub fn is_signed(&self) -> bool {
        !(is_zero(&self.v) && is_zero(&self.r) && is_zero(&self.s))
    }

    /// A copy of this transaction carrying the given signature values.
    pub fn with_signature_values(&self, v: BigUint, r: BigUint, s: BigUint) -> Transaction {
        Transaction {
            v,
            r,
            s,
            ..self.clone()
        }
    }

    /// A copy with the signature cleared.
    pub fn unsigned(&self) -> Transaction {
        self.with_signature_values(BigUint::default(), BigUint::default(), BigUint::default())
    }

    /// Keccak-256 of the signing payload. This is the digest that gets signed,
    /// so it ignores `version` and the signature.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Keccak-256 of the full wire encoding.
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash()))
    }
}

fn is_zero(n: &BigUint) -> bool {
    n.bits() == 0
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] values.
///
/// Every field defaults to zero/empty, the recipient to `None` and the
/// version to the current format version.
///
/// ```
/// use qkc_protocol::transaction::{Address, TransactionBuilder};
///
/// let tx = TransactionBuilder::new()
///     .nonce(7)
///     .gas_limit(6_000_000)
///     .recipient(Address::ZERO)
///     .payload(br#"{"k":"v"}"#.to_vec())
///     .network_id(1)
///     .full_shard_keys(262_145)
///     .build();
///
/// assert!(!tx.is_signed());
/// assert_eq!(tx.nonce(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: Transaction,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            tx: Transaction {
                nonce: 0,
                gas_price: BigUint::default(),
                gas_limit: 0,
                recipient: None,
                amount: BigUint::default(),
                payload: Vec::new(),
                network_id: 0,
                from_full_shard_key: FullShardKey::default(),
                to_full_shard_key: FullShardKey::default(),
                gas_token_id: 0,
                transfer_token_id: 0,
                version: TX_VERSION,
                v: BigUint::default(),
                r: BigUint::default(),
                s: BigUint::default(),
            },
        }
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.tx.nonce = nonce;
        self
    }

    pub fn gas_price(mut self, gas_price: impl Into<BigUint>) -> Self {
        self.tx.gas_price = gas_price.into();
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.tx.gas_limit = gas_limit;
        self
    }

    pub fn recipient(mut self, recipient: Address) -> Self {
        self.tx.recipient = Some(recipient);
        self
    }

    /// Clears the recipient, making this a contract creation.
    pub fn contract_creation(mut self) -> Self {
        self.tx.recipient = None;
        self
    }

    pub fn amount(mut self, amount: impl Into<BigUint>) -> Self {
        self.tx.amount = amount.into();
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.tx.payload = payload.into();
        self
    }

    pub fn network_id(mut self, network_id: u32) -> Self {
        self.tx.network_id = network_id;
        self
    }

    pub fn from_full_shard_key(mut self, key: impl Into<FullShardKey>) -> Self {
        self.tx.from_full_shard_key = key.into();
        self
    }

    pub fn to_full_shard_key(mut self, key: impl Into<FullShardKey>) -> Self {
        self.tx.to_full_shard_key = key.into();
        self
    }

    /// Sets source and destination shard to the same key.
    pub fn full_shard_keys(self, key: impl Into<FullShardKey>) -> Self {
        let key = key.into();
        self.from_full_shard_key(key).to_full_shard_key(key)
    }

    pub fn gas_token_id(mut self, id: u64) -> Self {
        self.tx.gas_token_id = id;
        self
    }

    pub fn transfer_token_id(mut self, id: u64) -> Self {
        self.tx.transfer_token_id = id;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.tx.version = version;
        self
    }

    /// Finishes construction. The result is always unsigned.
    pub fn build(self) -> Transaction {
        self.tx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
