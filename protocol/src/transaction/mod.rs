//! # Transaction Module
//!
//! Construction, encoding and signing of ledger transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs     Address and FullShardKey value types
//! token.rs     token symbol to numeric id
//! builder.rs   the Transaction record and its fluent builder
//! encoding.rs  RLP wire form and signing payload
//! signing.rs   recoverable secp256k1 signatures over the signing payload
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] assembles the unsigned fields.
//! 2. **Sign**: [`sign_transaction`] returns a signed copy.
//! 3. **Encode**: [`Transaction::encode`] produces the bytes submitted to the
//!    ledger as `0x`-prefixed hex.
//!
//! Transactions never change after construction. Gas price, amount and the
//! signature components are arbitrary-precision integers.

pub mod builder;
pub mod encoding;
pub mod signing;
pub mod token;
pub mod types;

pub use builder::{Transaction, TransactionBuilder};
pub use encoding::{FieldError, TransactionCodecError, UnsignedTransaction};
pub use signing::{recover_signer, sign_transaction, signature_values, SigningError};
pub use token::{encode_token_id, try_encode_token_id, TokenError};
pub use types::{derive_full_shard_id, Address, AddressError, FullShardKey};
