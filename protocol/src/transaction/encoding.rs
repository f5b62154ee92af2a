//! Wire encoding of transactions.
//!
//! A transaction is an RLP list with this field order:
//!
//! ```text
//!  0 nonce               u64, minimal big-endian
//!  1 gas_price           big integer
//!  2 gas_limit           u64
//!  3 recipient           empty string (contract creation) or 20 bytes
//!  4 amount              big integer
//!  5 payload             byte string
//!  6 network_id          u32
//!  7 from_full_shard_key fixed width: 0x84 || be32
//!  8 to_full_shard_key   fixed width
//!  9 gas_token_id        u64
//! 10 transfer_token_id   u64
//! 11 version             u32
//! 12 v, 13 r, 14 s       big integers
//! ```
//!
//! The signing payload is the list of fields 0..=10 only.

use num_bigint::BigUint;
use thiserror::Error;

use super::builder::Transaction;
use super::types::{Address, FullShardKey, ADDRESS_LENGTH};
use crate::codec::fixed_width::FixedWidthError;
use crate::codec::rlp::{RlpError, RlpItem, RlpStream};
use crate::config::TX_VERSION;

/// Number of fields covered by the signature.
pub const SIGNING_FIELD_COUNT: usize = 11;

/// Number of fields in the full wire form.
pub const WIRE_FIELD_COUNT: usize = 15;

const FIELD_NAMES: [&str; WIRE_FIELD_COUNT] = [
    "nonce",
    "gas_price",
    "gas_limit",
    "recipient",
    "amount",
    "payload",
    "network_id",
    "from_full_shard_key",
    "to_full_shard_key",
    "gas_token_id",
    "transfer_token_id",
    "version",
    "v",
    "r",
    "s",
];

/// Why a single field failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error(transparent)]
    Rlp(#[from] RlpError),

    #[error(transparent)]
    FixedWidth(#[from] FixedWidthError),

    #[error("recipient must be empty or {ADDRESS_LENGTH} bytes, got {0}")]
    RecipientLength(usize),
}

/// Errors produced while decoding a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionCodecError {
    #[error("malformed transaction envelope: {0}")]
    Envelope(#[from] RlpError),

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid field `{field}`: {source}")]
    Field {
        field: &'static str,
        source: FieldError,
    },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl Transaction {
    fn append_signed_fields(&self, s: &mut RlpStream) {
        s.append_u64(self.nonce)
            .append_biguint(&self.gas_price)
            .append_u64(self.gas_limit);
        match &self.recipient {
            Some(addr) => s.append_bytes(addr.as_bytes()),
            None => s.append_empty(),
        };
        s.append_biguint(&self.amount)
            .append_bytes(&self.payload)
            .append_u32(self.network_id)
            .append_raw(&self.from_full_shard_key.encode_fixed())
            .append_raw(&self.to_full_shard_key.encode_fixed())
            .append_u64(self.gas_token_id)
            .append_u64(self.transfer_token_id);
    }

    /// The bytes whose Keccak-256 is signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut s = RlpStream::new();
        self.append_signed_fields(&mut s);
        s.out()
    }

    /// Full wire encoding, as submitted to the ledger.
    pub fn encode(&self) -> Vec<u8> {
        let mut s = RlpStream::new();
        self.append_signed_fields(&mut s);
        s.append_u32(self.version)
            .append_biguint(&self.v)
            .append_biguint(&self.r)
            .append_biguint(&self.s);
        s.out()
    }

    /// Inverse of [`Transaction::encode`].
    pub fn decode(data: &[u8]) -> Result<Transaction, TransactionCodecError> {
        let mut fields = FieldReader::open(data, WIRE_FIELD_COUNT)?;
        let mut tx = fields.signed_fields()?;
        tx.version = fields.next(|item| Ok(item.as_u32()?))?;
        tx.v = fields.next(|item| Ok(item.as_biguint()?))?;
        tx.r = fields.next(|item| Ok(item.as_biguint()?))?;
        tx.s = fields.next(|item| Ok(item.as_biguint()?))?;
        Ok(tx)
    }
}

// ---------------------------------------------------------------------------
// UnsignedTransaction
// ---------------------------------------------------------------------------

/// The signed-over part of a transaction.
///
/// Carries no version and no signature; converting back into a
/// [`Transaction`] fills in the current version and a zero signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction(Transaction);

impl UnsignedTransaction {
    /// Decodes the 11-field list produced by [`Transaction::signing_payload`].
    pub fn decode_signing_payload(data: &[u8]) -> Result<Self, TransactionCodecError> {
        let mut fields = FieldReader::open(data, SIGNING_FIELD_COUNT)?;
        fields.signed_fields().map(Self)
    }

    pub fn signing_payload(&self) -> Vec<u8> {
        self.0.signing_payload()
    }

    pub fn as_transaction(&self) -> &Transaction {
        &self.0
    }

    pub fn into_transaction(self) -> Transaction {
        self.0
    }
}

impl From<&Transaction> for UnsignedTransaction {
    fn from(tx: &Transaction) -> Self {
        let mut inner = tx.unsigned();
        inner.version = TX_VERSION;
        Self(inner)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct FieldReader<'a> {
    items: Vec<RlpItem<'a>>,
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn open(data: &'a [u8], expected: usize) -> Result<Self, TransactionCodecError> {
        let items = RlpItem::new(data)?.items()?;
        if items.len() != expected {
            return Err(TransactionCodecError::FieldCount {
                expected,
                found: items.len(),
            });
        }
        Ok(Self { items, pos: 0 })
    }

    fn next<T>(
        &mut self,
        parse: impl FnOnce(&RlpItem<'a>) -> Result<T, FieldError>,
    ) -> Result<T, TransactionCodecError> {
        let index = self.pos;
        let item = self
            .items
            .get(index)
            .ok_or(TransactionCodecError::FieldCount {
                expected: index + 1,
                found: self.items.len(),
            })?;
        self.pos += 1;
        parse(item).map_err(|source| TransactionCodecError::Field {
            field: FIELD_NAMES[index],
            source,
        })
    }

    fn signed_fields(&mut self) -> Result<Transaction, TransactionCodecError> {
        let nonce = self.next(|item| Ok(item.as_u64()?))?;
        let gas_price = self.next(|item| Ok(item.as_biguint()?))?;
        let gas_limit = self.next(|item| Ok(item.as_u64()?))?;
        let recipient = self.next(decode_recipient)?;
        let amount = self.next(|item| Ok(item.as_biguint()?))?;
        let payload = self.next(|item| Ok(item.as_bytes()?.to_vec()))?;
        let network_id = self.next(|item| Ok(item.as_u32()?))?;
        let from_full_shard_key = self.next(decode_shard_key)?;
        let to_full_shard_key = self.next(decode_shard_key)?;
        let gas_token_id = self.next(|item| Ok(item.as_u64()?))?;
        let transfer_token_id = self.next(|item| Ok(item.as_u64()?))?;

        Ok(Transaction {
            nonce,
            gas_price,
            gas_limit,
            recipient,
            amount,
            payload,
            network_id,
            from_full_shard_key,
            to_full_shard_key,
            gas_token_id,
            transfer_token_id,
            version: TX_VERSION,
            v: BigUint::default(),
            r: BigUint::default(),
            s: BigUint::default(),
        })
    }
}

fn decode_recipient(item: &RlpItem<'_>) -> Result<Option<Address>, FieldError> {
    let bytes = item.as_bytes()?;
    match bytes.len() {
        0 => Ok(None),
        ADDRESS_LENGTH => Address::from_slice(bytes)
            .map(Some)
            .map_err(|_| FieldError::RecipientLength(bytes.len())),
        n => Err(FieldError::RecipientLength(n)),
    }
}

fn decode_shard_key(item: &RlpItem<'_>) -> Result<FullShardKey, FieldError> {
    Ok(FullShardKey::decode_fixed(item.as_raw())?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
