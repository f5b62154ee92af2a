// Copyright (c) 2026 QKC Data Service Developers. MIT License.
// See LICENSE for details.

//! # QKC Protocol Core Library
//!
//! Client-side protocol machinery for storing opaque JSON payloads on a
//! sharded EVM-style ledger as signed data transactions.
//!
//! ## Architecture
//!
//! - **codec**: RLP and the fixed-width shard key encoding.
//! - **crypto**: Keccak/SHA-256, secp256k1 keys and the keystore.
//! - **identity**: the signing identity and its shard-qualified address.
//! - **transaction**: the transaction record, wire codec and signing.
//! - **network**: JSON-RPC client, nonce allocation and the submission
//!   pipeline.
//! - **config**: protocol constants and runtime knobs.
//!
//! The service binary lives in the `qkc-data-service` crate and only wires
//! these pieces to HTTP.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod identity;
pub mod network;
pub mod transaction;
