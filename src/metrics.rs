//! Prometheus metrics for the wallet monitor
//!
//! Exposes metrics endpoint for monitoring:
//! - Checks by outcome and check latency
//! - Detected transactions and fired alerts
//! - Notification delivery results
//! - Provider failures by feed category
//! - Monitored wallet count

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics state
pub struct MetricsState {
    /// Prometheus registry
    registry: Registry,
    /// Checks by outcome (completed, skipped, provider_unavailable, discarded)
    pub checks_total: IntCounterVec,
    /// Check latency histogram (in milliseconds)
    pub check_latency: Histogram,
    /// New transactions found by checks
    pub transactions_detected: IntCounter,
    /// (rule, transaction) pairs that fired
    pub alerts_fired: IntCounter,
    /// Messages delivered to the sink
    pub notifications_sent: IntCounter,
    /// Messages the sink rejected or that timed out
    pub notifications_failed: IntCounter,
    /// Provider feed failures by category (native, token)
    pub provider_failures: IntCounterVec,
    /// Wallets currently registered
    pub monitored_wallets: IntGauge,
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        let checks_total = IntCounterVec::new(
            Opts::new("wallet_monitor_checks_total", "Wallet checks by outcome"),
            &["outcome"],
        )
        .expect("Failed to create checks_total counter");
        registry
            .register(Box::new(checks_total.clone()))
            .expect("Failed to register checks_total");

        let check_latency = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_monitor_check_latency_ms",
                "Wallet check latency in milliseconds",
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]),
        )
        .expect("Failed to create check_latency histogram");
        registry
            .register(Box::new(check_latency.clone()))
            .expect("Failed to register check_latency");

        let transactions_detected = IntCounter::with_opts(Opts::new(
            "wallet_monitor_transactions_detected_total",
            "New transactions detected across all wallets",
        ))
        .expect("Failed to create transactions_detected counter");
        registry
            .register(Box::new(transactions_detected.clone()))
            .expect("Failed to register transactions_detected");

        let alerts_fired = IntCounter::with_opts(Opts::new(
            "wallet_monitor_alerts_fired_total",
            "Alert rules that fired",
        ))
        .expect("Failed to create alerts_fired counter");
        registry
            .register(Box::new(alerts_fired.clone()))
            .expect("Failed to register alerts_fired");

        let notifications_sent = IntCounter::with_opts(Opts::new(
            "wallet_monitor_notifications_sent_total",
            "Notifications delivered to the sink",
        ))
        .expect("Failed to create notifications_sent counter");
        registry
            .register(Box::new(notifications_sent.clone()))
            .expect("Failed to register notifications_sent");

        let notifications_failed = IntCounter::with_opts(Opts::new(
            "wallet_monitor_notifications_failed_total",
            "Notifications that failed delivery",
        ))
        .expect("Failed to create notifications_failed counter");
        registry
            .register(Box::new(notifications_failed.clone()))
            .expect("Failed to register notifications_failed");

        let provider_failures = IntCounterVec::new(
            Opts::new(
                "wallet_monitor_provider_failures_total",
                "Data provider feed failures by category",
            ),
            &["category"],
        )
        .expect("Failed to create provider_failures counter");
        registry
            .register(Box::new(provider_failures.clone()))
            .expect("Failed to register provider_failures");

        let monitored_wallets = IntGauge::with_opts(Opts::new(
            "wallet_monitor_monitored_wallets",
            "Number of wallets currently monitored",
        ))
        .expect("Failed to create monitored_wallets gauge");
        registry
            .register(Box::new(monitored_wallets.clone()))
            .expect("Failed to register monitored_wallets");

        Self {
            registry,
            checks_total,
            check_latency,
            transactions_detected,
            alerts_fired,
            notifications_sent,
            notifications_failed,
            provider_failures,
            monitored_wallets,
        }
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_check(&self, outcome: &str) {
        self.checks_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_provider_failure(&self, category: &str) {
        self.provider_failures.with_label_values(&[category]).inc();
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry().gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("Content-Type", "text/plain; version=0.0.4")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        buffer,
    )
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
