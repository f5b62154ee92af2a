//! # Submission Pipeline
//!
//! [`QkcSdk`] turns an opaque payload into a signed data transaction on the
//! ledger and reads payloads back by transaction id.
//!
//! ```text
//! submit(payload)
//!   size check ── too large ──> PayloadTooLarge   (no nonce consumed)
//!   allocate nonce
//!   build → sign → encode → sendRawTransaction
//!   any failure after allocation ──> resync nonce, return the error
//! ```
//!
//! One `QkcSdk` is shared by every request handler through an `Arc`.

use num_bigint::BigUint;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::client::{LedgerRpc, RpcClientError};
use super::nonce::{NonceAllocator, NonceError};
use crate::config::{SdkConfig, NATIVE_TOKEN_SYMBOL, REJECTED_TX_ID};
use crate::identity::{QkcAddress, SigningIdentity};
use crate::transaction::{sign_transaction, Address, SigningError, Transaction, TransactionBuilder};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from [`QkcSdk::submit`].
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("payload too large: {len} bytes, limit is {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("ledger call failed: {0}")]
    Rpc(#[from] RpcClientError),

    /// The ledger answered with the rejection id instead of a real one.
    #[error("transaction rejected by the ledger")]
    Rejected { tx_id: String },
}

impl SubmitError {
    /// The id the ledger returned, if the call got that far.
    pub fn remote_tx_id(&self) -> Option<&str> {
        match self {
            SubmitError::Rejected { tx_id } => Some(tx_id),
            _ => None,
        }
    }
}

/// Errors from [`QkcSdk::query`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("ledger call failed: {0}")]
    Rpc(#[from] RpcClientError),

    #[error("txid {0} not in the chain")]
    NotFound(String),

    #[error("transaction {tx_id} has malformed data: {reason}")]
    MalformedData { tx_id: String, reason: String },
}

/// Errors from [`QkcSdk::connect`].
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("failed to fetch network info: {0}")]
    NetworkInfo(#[source] RpcClientError),

    #[error("failed to fetch account data: {0}")]
    AccountData(#[source] RpcClientError),

    #[error("account {address} has no {token} balance")]
    NoBalance { address: QkcAddress, token: String },
}

// ---------------------------------------------------------------------------
// QkcSdk
// ---------------------------------------------------------------------------

/// Signs and submits data transactions for one identity.
pub struct QkcSdk {
    ledger: Arc<dyn LedgerRpc>,
    identity: SigningIdentity,
    config: SdkConfig,
    network_id: u32,
    nonces: NonceAllocator,
}

impl std::fmt::Debug for QkcSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QkcSdk")
            .field("address", &self.identity.address())
            .field("network_id", &self.network_id)
            .field("nonce", &self.nonces.current())
            .finish()
    }
}

impl QkcSdk {
    /// Assembles an SDK from known parts without contacting the ledger.
    pub fn new(
        identity: SigningIdentity,
        ledger: Arc<dyn LedgerRpc>,
        config: SdkConfig,
        network_id: u32,
        initial_nonce: u64,
    ) -> Self {
        Self {
            ledger,
            identity,
            config,
            network_id,
            nonces: NonceAllocator::new(initial_nonce),
        }
    }

    /// Startup sequence: network id, nonce, then balance check.
    ///
    /// A failed nonce resync is logged and the counter starts at zero; a
    /// missing network id or an empty balance is fatal.
    pub async fn connect(
        identity: SigningIdentity,
        ledger: Arc<dyn LedgerRpc>,
        config: SdkConfig,
    ) -> Result<Self, SdkError> {
        let info = ledger.network_info().await.map_err(SdkError::NetworkInfo)?;
        info!(network_id = info.network_id, "connected to ledger");

        let sdk = Self::new(identity, ledger, config, info.network_id, 0);
        if let Err(e) = sdk.resync_nonce().await {
            error!(error = %e, "initial nonce resync failed, starting from 0");
        }
        sdk.balance_check().await?;
        Ok(sdk)
    }

    /// Logs every token balance of the signing account and fails when the
    /// native token balance is zero or absent.
    pub async fn balance_check(&self) -> Result<BigUint, SdkError> {
        let address = self.identity.address();
        info!(%address, nonce = self.nonces.current(), "signing account");

        let account = self
            .ledger
            .account_data(&address)
            .await
            .map_err(SdkError::AccountData)?;
        for b in &account.balances {
            info!(token = %b.token_str, balance = %b.balance, "balance (wei)");
        }

        match account.balance_of(NATIVE_TOKEN_SYMBOL) {
            Some(balance) if balance.bits() > 0 => Ok(balance.clone()),
            _ => Err(SdkError::NoBalance {
                address,
                token: NATIVE_TOKEN_SYMBOL.to_string(),
            }),
        }
    }

    pub fn address(&self) -> QkcAddress {
        self.identity.address()
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// The nonce the next submission will use.
    pub fn current_nonce(&self) -> u64 {
        self.nonces.current()
    }

    pub fn resync_count(&self) -> u64 {
        self.nonces.resync_count()
    }

    /// Pulls the account's nonce from the ledger.
    pub async fn resync_nonce(&self) -> Result<u64, NonceError> {
        self.nonces
            .resync(&*self.ledger, &self.identity.address())
            .await
    }

    /// The unsigned data transaction for `payload` at `nonce`.
    pub fn build_transaction(&self, nonce: u64, payload: &[u8]) -> Transaction {
        TransactionBuilder::new()
            .nonce(nonce)
            .gas_price(self.config.gas_price.clone())
            .gas_limit(self.config.gas_limit)
            .recipient(Address::ZERO)
            .amount(0u8)
            .payload(payload)
            .network_id(self.network_id)
            .full_shard_keys(self.identity.full_shard_key())
            .gas_token_id(self.config.gas_token_id)
            .transfer_token_id(self.config.transfer_token_id)
            .build()
    }

    /// Submits `payload` and returns the ledger's transaction id unchanged.
    pub async fn submit(&self, payload: &[u8]) -> Result<String, SubmitError> {
        let max = self.config.max_payload_len;
        if payload.len() > max {
            return Err(SubmitError::PayloadTooLarge {
                len: payload.len(),
                max,
            });
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("submit", %request_id, len = payload.len());
        async move {
            let nonce = self.nonces.allocate();
            match self.send(nonce, payload).await {
                Ok(tx_id) => {
                    info!(nonce, %tx_id, "transaction submitted");
                    Ok(tx_id)
                }
                Err(e) => {
                    warn!(nonce, error = %e, "submission failed, resyncing nonce");
                    if let Err(resync) = self.resync_nonce().await {
                        error!(error = %resync, "nonce resync failed");
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn send(&self, nonce: u64, payload: &[u8]) -> Result<String, SubmitError> {
        let tx = self.build_transaction(nonce, payload);
        let signed = sign_transaction(&tx, &self.identity)?;
        let raw = format!("0x{}", hex::encode(signed.encode()));
        tracing::debug!(hash = %signed.hash_hex(), "sending raw transaction");

        let tx_id = self.ledger.send_raw_transaction(&raw).await?;
        if tx_id == REJECTED_TX_ID {
            return Err(SubmitError::Rejected { tx_id });
        }
        Ok(tx_id)
    }

    /// Fetches the payload stored by transaction `tx_id`.
    pub async fn query(&self, tx_id: &str) -> Result<Vec<u8>, QueryError> {
        let tx = self
            .ledger
            .transaction_by_id(tx_id)
            .await?
            .ok_or_else(|| QueryError::NotFound(tx_id.to_string()))?;

        let malformed = |reason: &str| QueryError::MalformedData {
            tx_id: tx_id.to_string(),
            reason: reason.to_string(),
        };
        let data = tx
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| malformed("missing `data` field"))?;
        let digits = data.strip_prefix("0x").unwrap_or(data);
        hex::decode(digits).map_err(|e| malformed(&e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::rpc::{AccountData, NetworkInfo, TokenBalance};
    use crate::transaction::{recover_signer, FullShardKey};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[derive(Default)]
    struct MockLedger {
        sent: Mutex<Vec<String>>,
        reply: Mutex<Option<Result<String, RpcClientError>>>,
        tx_count: Mutex<u64>,
        qkc_balance: Mutex<u64>,
        stored: Mutex<Option<Value>>,
        network_down: bool,
    }

    #[async_trait]
    impl LedgerRpc for MockLedger {
        async fn network_info(&self) -> Result<NetworkInfo, RpcClientError> {
            if self.network_down {
                return Err(RpcClientError::Transport("down".into()));
            }
            Ok(NetworkInfo { network_id: 3 })
        }

        async fn account_data(&self, address: &QkcAddress) -> Result<AccountData, RpcClientError> {
            Ok(AccountData {
                full_shard_id: address.full_shard_key.full_shard_id(),
                transaction_count: *self.tx_count.lock(),
                balances: vec![TokenBalance {
                    token_str: "QKC".into(),
                    balance: BigUint::from(*self.qkc_balance.lock()),
                }],
            })
        }

        async fn send_raw_transaction(&self, raw: &str) -> Result<String, RpcClientError> {
            self.sent.lock().push(raw.to_string());
            match self.reply.lock().clone() {
                Some(reply) => reply,
                None => Ok(format!("0x{}", "11".repeat(36))),
            }
        }

        async fn transaction_by_id(&self, _tx_id: &str) -> Result<Option<Value>, RpcClientError> {
            Ok(self.stored.lock().clone())
        }
    }

    fn sdk_with(ledger: Arc<MockLedger>, nonce: u64) -> QkcSdk {
        let identity = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        QkcSdk::new(identity, ledger, SdkConfig::default(), 3, nonce)
    }

    fn decode_sent(raw: &str) -> Transaction {
        Transaction::decode(&hex::decode(&raw[2..]).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn submit_builds_expected_transaction() {
        let ledger = Arc::new(MockLedger::default());
        let sdk = sdk_with(ledger.clone(), 4);

        let id = sdk.submit(br#"{"k":"v"}"#).await.unwrap();
        assert_eq!(id, format!("0x{}", "11".repeat(36)));

        let sent = ledger.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("0x"));
        let tx = decode_sent(&sent[0]);
        assert_eq!(tx.nonce(), 4);
        assert_eq!(tx.recipient(), Some(Address::ZERO));
        assert_eq!(tx.amount(), &BigUint::default());
        assert_eq!(tx.gas_limit(), 6_000_000);
        assert_eq!(tx.gas_price(), &BigUint::from(1_000_000_000u64));
        assert_eq!(tx.network_id(), 3);
        assert_eq!(tx.from_full_shard_key(), FullShardKey(262_145));
        assert_eq!(tx.to_full_shard_key(), FullShardKey(262_145));
        assert_eq!(tx.gas_token_id(), 35_760);
        assert_eq!(tx.transfer_token_id(), 35_760);
        assert_eq!(tx.version(), 0);
        assert_eq!(tx.payload(), br#"{"k":"v"}"#);
        assert_eq!(recover_signer(&tx).unwrap(), sdk.address().recipient);
        assert_eq!(sdk.current_nonce(), 5);
    }

    #[tokio::test]
    async fn shard_key_comes_from_identity() {
        let ledger = Arc::new(MockLedger::default());
        let identity = SigningIdentity::from_hex(KEY, 0x0003_0001u32).unwrap();
        let sdk = QkcSdk::new(identity, ledger.clone(), SdkConfig::default(), 3, 0);

        sdk.submit(b"{}").await.unwrap();
        let tx = decode_sent(&ledger.sent.lock()[0]);
        assert_eq!(tx.from_full_shard_key(), FullShardKey(0x0003_0001));
        assert_eq!(tx.to_full_shard_key(), FullShardKey(0x0003_0001));
        assert_eq!(sdk.address().full_shard_key, FullShardKey(0x0003_0001));
    }

    #[tokio::test]
    async fn oversized_payload_consumes_no_nonce() {
        let ledger = Arc::new(MockLedger::default());
        let sdk = sdk_with(ledger.clone(), 9);
        let payload = vec![b'a'; sdk.config().max_payload_len + 1];

        let err = sdk.submit(&payload).await.unwrap_err();
        assert!(matches!(err, SubmitError::PayloadTooLarge { len, max } if len == max + 1));
        assert_eq!(sdk.current_nonce(), 9);
        assert_eq!(sdk.resync_count(), 0);
        assert!(ledger.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn payload_at_limit_is_accepted() {
        let ledger = Arc::new(MockLedger::default());
        let sdk = sdk_with(ledger, 0);
        let payload = vec![b'a'; sdk.config().max_payload_len];
        assert!(sdk.submit(&payload).await.is_ok());
    }

    #[tokio::test]
    async fn sentinel_id_is_rejection_and_resyncs() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.reply.lock() = Some(Ok(REJECTED_TX_ID.to_string()));
        *ledger.tx_count.lock() = 2;
        let sdk = sdk_with(ledger.clone(), 10);

        let err = sdk.submit(b"{}").await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { .. }));
        assert_eq!(err.remote_tx_id(), Some(REJECTED_TX_ID));
        assert_eq!(sdk.resync_count(), 1);
        assert_eq!(sdk.current_nonce(), 2);
    }

    #[tokio::test]
    async fn rpc_failure_resyncs_and_surfaces_error() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.reply.lock() = Some(Err(RpcClientError::Remote {
            code: -32000,
            message: "nonce too low".into(),
        }));
        *ledger.tx_count.lock() = 20;
        let sdk = sdk_with(ledger.clone(), 1);

        let err = sdk.submit(b"{}").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "ledger call failed: ledger returned error -32000: nonce too low"
        );
        assert_eq!(sdk.current_nonce(), 20);

        *ledger.reply.lock() = None;
        sdk.submit(b"{}").await.unwrap();
        let sent = ledger.sent.lock().clone();
        assert_eq!(decode_sent(&sent[1]).nonce(), 20);
    }

    #[tokio::test]
    async fn query_decodes_data_field() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.stored.lock() = Some(json!({"data": "0x7b2261223a317d", "nonce": "0x1"}));
        let sdk = sdk_with(ledger, 0);
        assert_eq!(sdk.query("0xabc").await.unwrap(), br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn query_not_found() {
        let sdk = sdk_with(Arc::new(MockLedger::default()), 0);
        let err = sdk.query("0xdead").await.unwrap_err();
        assert_eq!(err.to_string(), "txid 0xdead not in the chain");
    }

    #[tokio::test]
    async fn query_malformed_data() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.stored.lock() = Some(json!({"data": "0xzz"}));
        let sdk = sdk_with(ledger.clone(), 0);
        assert!(matches!(
            sdk.query("0x1").await,
            Err(QueryError::MalformedData { .. })
        ));

        *ledger.stored.lock() = Some(json!({"hash": "0x1"}));
        assert!(matches!(
            sdk.query("0x1").await,
            Err(QueryError::MalformedData { .. })
        ));
    }

    #[tokio::test]
    async fn connect_runs_startup_sequence() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.tx_count.lock() = 77;
        *ledger.qkc_balance.lock() = 1_000;
        let identity = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();

        let sdk = QkcSdk::connect(identity, ledger, SdkConfig::default())
            .await
            .unwrap();
        assert_eq!(sdk.network_id(), 3);
        assert_eq!(sdk.current_nonce(), 77);
    }

    #[tokio::test]
    async fn connect_fails_without_balance() {
        let ledger = Arc::new(MockLedger::default());
        let identity = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        let err = QkcSdk::connect(identity, ledger, SdkConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::NoBalance { ref token, .. } if token == "QKC"));
    }

    #[tokio::test]
    async fn connect_fails_without_network() {
        let ledger = Arc::new(MockLedger {
            network_down: true,
            ..MockLedger::default()
        });
        let identity = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        assert!(matches!(
            QkcSdk::connect(identity, ledger, SdkConfig::default()).await,
            Err(SdkError::NetworkInfo(_))
        ));
    }
}
