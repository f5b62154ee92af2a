//! # HTTP API
//!
//! Builds the axum router for the data service. All endpoints share
//! application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path             | Description                                 |
//! |--------|------------------|---------------------------------------------|
//! | POST   | `/`              | Store the JSON body, returns the tx id      |
//! | GET    | `/?txHash=<id>`  | Fetch a stored payload by tx id             |
//! | GET    | `/health`        | Liveness probe                              |
//! | GET    | `/metrics`       | Prometheus metrics                          |
//!
//! `/` always answers `200 OK` with a pretty-printed envelope:
//!
//! ```text
//! { "code": 0 | 1, "msg": "successfully" | "failed:<reason>", "data": ... }
//! ```

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use qkc_protocol::network::{QkcSdk, SubmitError};

use crate::metrics::{metrics_handler, ServiceMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub sdk: Arc<QkcSdk>,
    pub metrics: Arc<ServiceMetrics>,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Outcome code of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    Succ = 0,
    Failed = 1,
}

impl Serialize for CodeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// The envelope every `/` response uses.
#[derive(Debug, Serialize)]
pub struct ReturnMsg {
    pub code: CodeStatus,
    pub msg: String,
    pub data: Option<Box<RawValue>>,
}

impl ReturnMsg {
    pub fn success(data: Option<Box<RawValue>>) -> Self {
        Self {
            code: CodeStatus::Succ,
            msg: "successfully".to_string(),
            data,
        }
    }

    pub fn failed(err: impl Display, data: Option<Box<RawValue>>) -> Self {
        Self {
            code: CodeStatus::Failed,
            msg: format!("failed:{err}"),
            data,
        }
    }
}

impl IntoResponse for ReturnMsg {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self) {
            Ok(mut body) => {
                body.push('\n');
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
                    body,
                )
                    .into_response()
            }
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// Embeds `bytes` verbatim when they are a JSON document.
fn raw_json(bytes: Vec<u8>) -> Option<Box<RawValue>> {
    let text = String::from_utf8(bytes).ok()?;
    RawValue::from_string(text).ok()
}

fn json_string(s: &str) -> Option<Box<RawValue>> {
    serde_json::value::to_raw_value(s).ok()
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(query_handler).post(submit_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "address": state.sdk.address().to_hex(),
        "networkId": state.sdk.network_id(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TxQuery {
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
}

/// `GET /?txHash=<id>`: the stored payload as raw JSON, or `null` when it is
/// not JSON.
async fn query_handler(State(state): State<AppState>, Query(q): Query<TxQuery>) -> ReturnMsg {
    state.metrics.queries_total.inc();

    let tx_hash = q.tx_hash.unwrap_or_default();
    if tx_hash.is_empty() {
        state.metrics.queries_failed_total.inc();
        return ReturnMsg::failed("missing txHash parameter", None);
    }

    match state.sdk.query(&tx_hash).await {
        Ok(bytes) => {
            tracing::debug!(%tx_hash, len = bytes.len(), "payload fetched");
            ReturnMsg::success(raw_json(bytes))
        }
        Err(e) => {
            tracing::info!(%tx_hash, error = %e, "payload lookup failed");
            state.metrics.queries_failed_total.inc();
            ReturnMsg::failed(e, None)
        }
    }
}

/// `POST /`: stores the body, which must be JSON and fit in one transaction.
///
/// On failure `data` carries the id the ledger returned, if any.
async fn submit_handler(State(state): State<AppState>, body: Bytes) -> ReturnMsg {
    state.metrics.submissions_total.inc();
    let started = Instant::now();

    let result = match validate_body(&state, &body) {
        Ok(()) => state.sdk.submit(&body).await.map_err(|e| {
            let tx_id = e.remote_tx_id().unwrap_or_default().to_string();
            (e.to_string(), tx_id)
        }),
        Err(e) => Err((e, String::new())),
    };
    state
        .metrics
        .submission_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(tx_id) => ReturnMsg::success(json_string(&tx_id)),
        Err((e, tx_id)) => {
            tracing::warn!(len = body.len(), error = %e, %tx_id, "submission failed");
            state.metrics.submissions_failed_total.inc();
            ReturnMsg::failed(e, json_string(&tx_id))
        }
    }
}

/// Rejections that happen before a nonce is allocated.
fn validate_body(state: &AppState, body: &[u8]) -> Result<(), String> {
    let max = state.sdk.config().max_payload_len;
    if body.len() > max {
        return Err(SubmitError::PayloadTooLarge {
            len: body.len(),
            max,
        }
        .to_string());
    }
    if serde_json::from_slice::<serde::de::IgnoredAny>(body).is_err() {
        return Err("bad json format".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use num_bigint::BigUint;
    use parking_lot::Mutex;
    use qkc_protocol::config::{SdkConfig, REJECTED_TX_ID};
    use qkc_protocol::identity::{QkcAddress, SigningIdentity};
    use qkc_protocol::network::rpc::{AccountData, NetworkInfo, TokenBalance};
    use qkc_protocol::network::{LedgerRpc, RpcClientError};
    use qkc_protocol::transaction::Transaction;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const TX_ID: &str = "0x11111111111111111111111111111111111111111111111111111111111111110004000a";

    /// Remembers what was sent and serves a fixed transaction by id.
    #[derive(Default)]
    struct MockLedger {
        sent: Mutex<Vec<Transaction>>,
        reject: bool,
        stored_data: Option<String>,
        tx_count: u64,
    }

    #[async_trait]
    impl LedgerRpc for MockLedger {
        async fn network_info(&self) -> Result<NetworkInfo, RpcClientError> {
            Ok(NetworkInfo { network_id: 1 })
        }

        async fn account_data(&self, address: &QkcAddress) -> Result<AccountData, RpcClientError> {
            Ok(AccountData {
                full_shard_id: address.full_shard_key.full_shard_id(),
                transaction_count: self.tx_count,
                balances: vec![TokenBalance {
                    token_str: "QKC".into(),
                    balance: BigUint::from(1u8),
                }],
            })
        }

        async fn send_raw_transaction(&self, raw: &str) -> Result<String, RpcClientError> {
            let bytes = hex::decode(&raw[2..]).expect("hex");
            self.sent
                .lock()
                .push(Transaction::decode(&bytes).expect("decodable"));
            if self.reject {
                Ok(REJECTED_TX_ID.to_string())
            } else {
                Ok(TX_ID.to_string())
            }
        }

        async fn transaction_by_id(&self, tx_id: &str) -> Result<Option<Value>, RpcClientError> {
            Ok(match (&self.stored_data, tx_id) {
                (Some(data), TX_ID) => Some(json!({ "data": data })),
                _ => None,
            })
        }
    }

    fn app(ledger: Arc<MockLedger>) -> (Router, AppState) {
        let identity = SigningIdentity::from_hex(KEY, 262_145u32).unwrap();
        let sdk = QkcSdk::new(identity, ledger, SdkConfig::default(), 1, 0);
        let state = AppState {
            version: "0.1.0-test".into(),
            sdk: Arc::new(sdk),
            metrics: Arc::new(ServiceMetrics::new()),
        };
        (create_router(state.clone()), state)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>, Option<String>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body, content_type)
    }

    async fn post(router: &Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // -- submit ---------------------------------------------------------------

    #[tokio::test]
    async fn post_valid_json_returns_tx_id() {
        let ledger = Arc::new(MockLedger::default());
        let (router, state) = app(ledger.clone());

        let (status, json) = post(&router, r#"{"temperature": 21}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "successfully");
        assert_eq!(json["data"], TX_ID);

        let sent = ledger.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload(), br#"{"temperature": 21}"#);
        assert_eq!(state.sdk.current_nonce(), 1);
        assert_eq!(state.metrics.submissions_total.get(), 1);
    }

    #[tokio::test]
    async fn post_invalid_json_is_rejected_without_nonce() {
        let ledger = Arc::new(MockLedger::default());
        let (router, state) = app(ledger.clone());

        let (_, json) = post(&router, "{not json").await;
        assert_eq!(json["code"], 1);
        assert_eq!(json["msg"], "failed:bad json format");
        assert_eq!(json["data"], "");
        assert!(ledger.sent.lock().is_empty());
        assert_eq!(state.sdk.current_nonce(), 0);
        assert_eq!(state.sdk.resync_count(), 0);
        assert_eq!(state.metrics.submissions_failed_total.get(), 1);
    }

    #[tokio::test]
    async fn post_oversized_body_is_rejected_without_nonce() {
        let ledger = Arc::new(MockLedger::default());
        let (router, state) = app(ledger.clone());
        let max = state.sdk.config().max_payload_len;
        let body = format!("\"{}\"", "a".repeat(max));

        let (_, json) = post(&router, body).await;
        assert_eq!(json["code"], 1);
        assert!(json["msg"]
            .as_str()
            .unwrap()
            .starts_with("failed:payload too large"));
        assert!(ledger.sent.lock().is_empty());
        assert_eq!(state.sdk.current_nonce(), 0);
    }

    #[tokio::test]
    async fn post_rejected_by_ledger_resyncs() {
        let ledger = Arc::new(MockLedger {
            reject: true,
            tx_count: 40,
            ..MockLedger::default()
        });
        let (router, state) = app(ledger);

        let (_, json) = post(&router, "[1,2,3]").await;
        assert_eq!(json["code"], 1);
        assert_eq!(json["msg"], "failed:transaction rejected by the ledger");
        assert_eq!(json["data"], REJECTED_TX_ID);
        assert_eq!(state.sdk.current_nonce(), 40);
        assert_eq!(state.sdk.resync_count(), 1);
    }

    // -- query ----------------------------------------------------------------

    #[tokio::test]
    async fn get_returns_raw_json_payload() {
        let ledger = Arc::new(MockLedger {
            stored_data: Some(format!("0x{}", hex::encode(br#"{"b":[1,2]}"#))),
            ..MockLedger::default()
        });
        let (router, _) = app(ledger);

        let (status, body, content_type) = get(&router, &format!("/?txHash={TX_ID}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            content_type.as_deref(),
            Some("application/json; charset=utf-8")
        );
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\n  \"code\": 0"), "pretty printed: {text}");
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["msg"], "successfully");
        assert_eq!(json["data"], json!({"b": [1, 2]}));
    }

    #[tokio::test]
    async fn get_non_json_payload_yields_null_data() {
        let ledger = Arc::new(MockLedger {
            stored_data: Some(format!("0x{}", hex::encode(b"\x00\x01binary"))),
            ..MockLedger::default()
        });
        let (router, _) = app(ledger);

        let (_, body, _) = get(&router, &format!("/?txHash={TX_ID}")).await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 0);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn get_unknown_id_fails() {
        let (router, state) = app(Arc::new(MockLedger::default()));
        let (_, body, _) = get(&router, "/?txHash=0xdead").await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 1);
        assert_eq!(json["msg"], "failed:txid 0xdead not in the chain");
        assert!(json["data"].is_null());
        assert_eq!(state.metrics.queries_failed_total.get(), 1);
    }

    #[tokio::test]
    async fn get_without_tx_hash_fails() {
        let (router, _) = app(Arc::new(MockLedger::default()));
        let (_, body, _) = get(&router, "/").await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 1);
    }

    // -- ops ------------------------------------------------------------------

    #[tokio::test]
    async fn health_reports_identity() {
        let (router, state) = app(Arc::new(MockLedger::default()));
        let (status, body, _) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["address"], state.sdk.address().to_hex());
        assert_eq!(json["networkId"], 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_counters() {
        let (router, _) = app(Arc::new(MockLedger::default()));
        post(&router, "{}").await;
        let (status, body, _) = get(&router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("qkc_submissions_total 1"));
        assert!(text.contains("qkc_next_nonce 1"));
    }

    #[test]
    fn envelope_serialization() {
        let ok = serde_json::to_value(ReturnMsg::success(json_string("0xab"))).unwrap();
        assert_eq!(ok, json!({"code": 0, "msg": "successfully", "data": "0xab"}));

        let failed = serde_json::to_value(ReturnMsg::failed("boom", None)).unwrap();
        assert_eq!(failed, json!({"code": 1, "msg": "failed:boom", "data": null}));
    }
}
