//! Ledger RPC client.
//!
//! [`LedgerRpc`] is the seam between the submission pipeline and the remote
//! ledger. [`HttpLedgerClient`] implements it over HTTP with `reqwest`;
//! tests substitute an in-process mock.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::rpc::{AccountData, AccountShards, NetworkInfo, RpcMethod, RpcRequest, RpcResponse};
use crate::config::DEFAULT_RPC_TIMEOUT;
use crate::identity::QkcAddress;

/// Errors from talking to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("ledger returned error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed {method} response: {reason}")]
    MalformedResponse { method: RpcMethod, reason: String },

    #[error("account has no shard with full shard id {full_shard_id}")]
    AccountNotFound { full_shard_id: u32 },
}

/// Calls the data service makes against the ledger.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `networkInfo`.
    async fn network_info(&self) -> Result<NetworkInfo, RpcClientError>;

    /// `getAccountData(address, null, true)`, narrowed to the shard the
    /// address's full shard key maps to.
    async fn account_data(&self, address: &QkcAddress) -> Result<AccountData, RpcClientError>;

    /// `sendRawTransaction`. Returns the ledger's transaction id verbatim.
    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<String, RpcClientError>;

    /// `getTransactionById([tx_id])`. `None` when the result is not an object.
    async fn transaction_by_id(&self, tx_id: &str) -> Result<Option<Value>, RpcClientError>;
}

// ---------------------------------------------------------------------------
// HttpLedgerClient
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Debug)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl HttpLedgerClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcClientError> {
        Self::with_timeout(endpoint, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Performs one call and returns the raw `result` (`None` for null).
    pub async fn call(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<Option<Value>, RpcClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(json!(id), method, params);
        debug!(%method, id, "ledger rpc call");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcClientError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| RpcClientError::Transport(e.to_string()))?;

        let body: RpcResponse =
            response
                .json()
                .await
                .map_err(|e| RpcClientError::MalformedResponse {
                    method,
                    reason: e.to_string(),
                })?;

        if let Some(err) = body.error {
            return Err(RpcClientError::Remote {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.result)
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<T, RpcClientError> {
        let result = self.call(method, params).await?.unwrap_or(Value::Null);
        parse_result(method, result)
    }
}

fn parse_result<T: DeserializeOwned>(method: RpcMethod, value: Value) -> Result<T, RpcClientError> {
    serde_json::from_value(value).map_err(|e| RpcClientError::MalformedResponse {
        method,
        reason: e.to_string(),
    })
}

#[async_trait]
impl LedgerRpc for HttpLedgerClient {
    async fn network_info(&self) -> Result<NetworkInfo, RpcClientError> {
        self.call_typed(RpcMethod::NetworkInfo, json!([])).await
    }

    async fn account_data(&self, address: &QkcAddress) -> Result<AccountData, RpcClientError> {
        let shards: AccountShards = self
            .call_typed(
                RpcMethod::GetAccountData,
                json!([address.to_hex(), Value::Null, true]),
            )
            .await?;
        let full_shard_id = address.full_shard_key.full_shard_id();
        shards
            .into_shard(full_shard_id)
            .ok_or(RpcClientError::AccountNotFound { full_shard_id })
    }

    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<String, RpcClientError> {
        self.call_typed(RpcMethod::SendRawTransaction, json!([raw_tx_hex]))
            .await
    }

    async fn transaction_by_id(&self, tx_id: &str) -> Result<Option<Value>, RpcClientError> {
        let result = self
            .call(RpcMethod::GetTransactionById, json!([tx_id]))
            .await?;
        Ok(result.filter(Value::is_object))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
