//! # Network Module
//!
//! Everything that talks to the remote ledger.
//!
//! ## Architecture
//!
//! ```text
//! rpc.rs     JSON-RPC 2.0 wire types and hex quantity parsing
//! client.rs  LedgerRpc trait and its reqwest implementation
//! nonce.rs   thread-safe nonce counter with ledger resync
//! sdk.rs     submit/query pipeline shared by the HTTP handlers
//! ```
//!
//! ## Design Decisions
//!
//! - The ledger is reached only through the [`LedgerRpc`] trait so the
//!   pipeline can be tested against an in-process mock.
//! - Nonces are handed out locally and only re-read from the ledger at
//!   startup and after a failed submission.

pub mod client;
pub mod nonce;
pub mod rpc;
pub mod sdk;

pub use client::{HttpLedgerClient, LedgerRpc, RpcClientError};
pub use nonce::{NonceAllocator, NonceError, NonceSource};
pub use rpc::{AccountData, NetworkInfo, RpcError, RpcMethod, RpcRequest, RpcResponse, TokenBalance};
pub use sdk::{QkcSdk, QueryError, SdkError, SubmitError};
