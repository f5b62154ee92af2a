//! # JSON-RPC Definitions
//!
//! Wire types for the ledger's JSON-RPC 2.0 API. Only the four methods the
//! data service calls are modelled:
//!
//! | Method               | Params                              | Result                 |
//! |----------------------|-------------------------------------|------------------------|
//! | `networkInfo`        | none                                | object with `networkId`|
//! | `getAccountData`     | `(address, null, include_shards)`   | object with `shards`   |
//! | `sendRawTransaction` | `(0x-hex tx)`                       | transaction id string  |
//! | `getTransactionById` | `([tx_id])`                         | object with `data`, or null |
//!
//! Numbers come back as `0x`-prefixed hex quantities.

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Ledger methods used by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    #[serde(rename = "networkInfo")]
    NetworkInfo,
    #[serde(rename = "getAccountData")]
    GetAccountData,
    #[serde(rename = "sendRawTransaction")]
    SendRawTransaction,
    #[serde(rename = "getTransactionById")]
    GetTransactionById,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcMethod::NetworkInfo => "networkInfo",
            RpcMethod::GetAccountData => "getAccountData",
            RpcMethod::SendRawTransaction => "sendRawTransaction",
            RpcMethod::GetTransactionById => "getTransactionById",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: serde_json::Value, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// A conforming server sets exactly one of `result` and `error`. A `null`
/// result deserializes to `None`, which callers treat as "no such object".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Errors
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self {
            code: -32601,
            message: format!("method not found: {}", method.into()),
            data: None,
        }
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: msg.into(),
            data: None,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

// ---------------------------------------------------------------------------
// Hex quantities
// ---------------------------------------------------------------------------

/// Errors from parsing a `0x`-prefixed hex quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity `{0}` is missing the 0x prefix")]
    MissingPrefix(String),

    #[error("quantity `{0}` is empty")]
    Empty(String),

    #[error("quantity `{0}` is not valid hex")]
    InvalidHex(String),

    #[error("quantity `{0}` does not fit in 64 bits")]
    Overflow(String),
}

fn quantity_digits(s: &str) -> Result<&str, QuantityError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| QuantityError::MissingPrefix(s.to_string()))?;
    if digits.is_empty() {
        return Err(QuantityError::Empty(s.to_string()));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QuantityError::InvalidHex(s.to_string()));
    }
    Ok(digits)
}

/// Parses a hex quantity such as `"0x1a"` into a `u64`.
pub fn decode_quantity_u64(s: &str) -> Result<u64, QuantityError> {
    let digits = quantity_digits(s)?;
    u64::from_str_radix(digits, 16).map_err(|_| QuantityError::Overflow(s.to_string()))
}

/// Parses a hex quantity of any size.
pub fn decode_quantity_big(s: &str) -> Result<BigUint, QuantityError> {
    let digits = quantity_digits(s)?;
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| QuantityError::InvalidHex(s.to_string()))
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let s = String::deserialize(d)?;
    decode_quantity_u64(&s).map_err(serde::de::Error::custom)
}

fn de_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = de_u64(d)?;
    u32::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("quantity {value} does not fit in 32 bits")))
}

fn de_big<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
    let s = String::deserialize(d)?;
    decode_quantity_big(&s).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of `networkInfo`. Other fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    #[serde(deserialize_with = "de_u32")]
    pub network_id: u32,
}

/// One entry of a shard's `balances` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token_str: String,
    #[serde(deserialize_with = "de_big")]
    pub balance: BigUint,
}

/// Per-shard account state from `getAccountData`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    #[serde(deserialize_with = "de_u32")]
    pub full_shard_id: u32,
    #[serde(deserialize_with = "de_u64")]
    pub transaction_count: u64,
    #[serde(default)]
    pub balances: Vec<TokenBalance>,
}

impl AccountData {
    /// Balance of the token with the given symbol, if the account holds any.
    pub fn balance_of(&self, token_str: &str) -> Option<&BigUint> {
        self.balances
            .iter()
            .find(|b| b.token_str.eq_ignore_ascii_case(token_str))
            .map(|b| &b.balance)
    }
}

/// Result of `getAccountData` with shards included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountShards {
    #[serde(default)]
    pub shards: Vec<AccountData>,
}

impl AccountShards {
    /// The shard whose full shard id matches, consuming the list.
    pub fn into_shard(self, full_shard_id: u32) -> Option<AccountData> {
        self.shards
            .into_iter()
            .find(|s| s.full_shard_id == full_shard_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
