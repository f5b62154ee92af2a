//! # Prometheus Metrics
//!
//! Operational metrics for the data service, rendered at `/metrics`.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the `qkc`
//! prefix.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

use crate::api::AppState;

/// Metric handles shared by every request handler.
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    /// Submissions received, including rejected ones.
    pub submissions_total: IntCounter,
    /// Submissions that returned an error.
    pub submissions_failed_total: IntCounter,
    /// Payload lookups received.
    pub queries_total: IntCounter,
    /// Payload lookups that returned an error.
    pub queries_failed_total: IntCounter,
    /// Nonce resyncs performed by the pipeline. Refreshed on scrape.
    pub nonce_resyncs: IntGauge,
    /// Nonce the next submission will use. Refreshed on scrape.
    pub next_nonce: IntGauge,
    /// Time from request to ledger response for submissions.
    pub submission_latency_seconds: Histogram,
}

impl ServiceMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("qkc".into()), None)
            .expect("failed to create prometheus registry");

        let submissions_total =
            IntCounter::new("submissions_total", "Total number of payload submissions")
                .expect("metric creation");
        registry
            .register(Box::new(submissions_total.clone()))
            .expect("metric registration");

        let submissions_failed_total = IntCounter::new(
            "submissions_failed_total",
            "Number of payload submissions that failed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(submissions_failed_total.clone()))
            .expect("metric registration");

        let queries_total = IntCounter::new("queries_total", "Total number of payload lookups")
            .expect("metric creation");
        registry
            .register(Box::new(queries_total.clone()))
            .expect("metric registration");

        let queries_failed_total =
            IntCounter::new("queries_failed_total", "Number of payload lookups that failed")
                .expect("metric creation");
        registry
            .register(Box::new(queries_failed_total.clone()))
            .expect("metric registration");

        let nonce_resyncs = IntGauge::new(
            "nonce_resyncs",
            "Number of nonce resyncs against the ledger since startup",
        )
        .expect("metric creation");
        registry
            .register(Box::new(nonce_resyncs.clone()))
            .expect("metric registration");

        let next_nonce = IntGauge::new("next_nonce", "Nonce the next submission will use")
            .expect("metric creation");
        registry
            .register(Box::new(next_nonce.clone()))
            .expect("metric registration");

        let submission_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Payload submission latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(submission_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            submissions_total,
            submissions_failed_total,
            queries_total,
            queries_failed_total,
            nonce_resyncs,
            next_nonce,
            submission_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = &state.metrics;
    metrics
        .nonce_resyncs
        .set(i64::try_from(state.sdk.resync_count()).unwrap_or(i64::MAX));
    metrics
        .next_nonce
        .set(i64::try_from(state.sdk.current_nonce()).unwrap_or(i64::MAX));

    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
