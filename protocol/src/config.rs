//! # Protocol Configuration & Constants
//!
//! Every magic number the data service depends on lives here. Most of them
//! are dictated by the remote ledger's validation rules, so changing one
//! without changing the ledger is a good way to get every transaction
//! rejected.

use std::time::Duration;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::transaction::token::encode_token_id;

// ---------------------------------------------------------------------------
// Gas
// ---------------------------------------------------------------------------

/// Gas limit attached to every data transaction.
pub const GAS_LIMIT: u64 = 6_000_000;

/// Gas price in wei (1 gwei).
pub const GAS_PRICE_WEI: u64 = 1_000_000_000;

/// Intrinsic gas charged for any transaction before payload costs.
pub const TX_BASE_GAS: u64 = 21_000;

/// Gas charged per non-zero payload byte. Used as the worst case for every byte.
pub const GAS_PER_PAYLOAD_BYTE: u64 = 68;

/// Largest payload that is guaranteed to fit inside [`GAS_LIMIT`].
pub const MAX_PAYLOAD_LEN: usize = ((GAS_LIMIT - TX_BASE_GAS) / GAS_PER_PAYLOAD_BYTE) as usize;

// ---------------------------------------------------------------------------
// Sharding & tokens
// ---------------------------------------------------------------------------

/// Full shard key the service sends from and to: chain 4, shard size 1, shard 0.
pub const DEFAULT_FULL_SHARD_KEY: u32 = 262_145;

/// Shard count this deployment assumes when deriving full shard ids.
pub const SHARD_SIZE: u32 = 1;

/// Symbol of the native token used both for gas and for transfers.
pub const NATIVE_TOKEN_SYMBOL: &str = "QKC";

/// Longest token symbol the token id encoding accepts.
pub const MAX_TOKEN_SYMBOL_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Leading byte of a fixed-width shard key field. Equal to the RLP header of
/// a 4-byte string.
pub const FIXED_WIDTH_TAG: u8 = 0x84;

/// Total width of an encoded shard key field, tag included.
pub const FIXED_WIDTH_LEN: usize = 5;

/// Length of a recoverable secp256k1 signature: `r || s || recovery_id`.
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 65;

/// Offset added to the recovery id when it is stored in `v`.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// Current transaction format version.
pub const TX_VERSION: u32 = 0;

// ---------------------------------------------------------------------------
// Remote ledger
// ---------------------------------------------------------------------------

/// Transaction id the ledger answers with when it refuses a transaction:
/// 32 hash bytes plus 4 shard key bytes, all zero.
pub const REJECTED_TX_ID: &str =
    "0x000000000000000000000000000000000000000000000000000000000000000000000000";

/// Attempts made by a nonce resync before giving up.
pub const RESYNC_ATTEMPTS: usize = 10;

/// Default timeout for a single JSON-RPC round trip.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP port of the data service.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// SdkConfig
// ---------------------------------------------------------------------------

/// Runtime knobs of the submission pipeline.
///
/// Defaults reproduce the constants above; tests and the CLI override
/// individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Gas price in wei.
    pub gas_price: BigUint,
    /// Gas limit per transaction.
    pub gas_limit: u64,
    /// Token id used to pay gas.
    pub gas_token_id: u64,
    /// Token id of the (always zero) transferred value.
    pub transfer_token_id: u64,
    /// Largest payload `submit` accepts.
    pub max_payload_len: usize,
}

impl Default for SdkConfig {
    fn default() -> Self {
        let token = encode_token_id(NATIVE_TOKEN_SYMBOL);
        Self {
            gas_price: BigUint::from(GAS_PRICE_WEI),
            gas_limit: GAS_LIMIT,
            gas_token_id: token,
            transfer_token_id: token,
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }
}
