//! # Identity Module
//!
//! The one signing identity a service instance owns.
//!
//! 1. **Keypair**: secp256k1 key material ([`crate::crypto::keys`]).
//! 2. **QKC address**: the 20-byte account address plus the full shard key
//!    it lives on. This is the account used both for sending and for
//!    balance/nonce queries.
//! 3. **Signing identity**: keypair and address bound together, immutable
//!    after construction. The nonce counter lives next to it in the
//!    submission pipeline, not inside it.

pub mod account;
pub mod qkc_address;

pub use account::SigningIdentity;
pub use qkc_address::{QkcAddress, QkcAddressError};
