//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Node pool height and availability
//! - Probe failures per chain
//! - Transaction submission outcomes

use crate::error::{BridgeError, BridgeResult};

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref CHAIN_HEIGHT: GaugeVec = register_gauge_vec!(
        "bridge_chain_height",
        "Maximum height observed in the last probe round",
        &["chain_id"]
    )
    .unwrap();

    pub static ref CHAIN_AVAILABLE: GaugeVec = register_gauge_vec!(
        "bridge_chain_available",
        "Node pool availability (1=some node answered, 0=degraded)",
        &["chain_id"]
    )
    .unwrap();

    pub static ref PROBE_FAILURES: CounterVec = register_counter_vec!(
        "bridge_node_probe_failures_total",
        "Total failed node height probes",
        &["chain_id"]
    )
    .unwrap();

    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "bridge_transactions_submitted_total",
        "Total transactions broadcast successfully",
        &["chain_id"]
    )
    .unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "bridge_transactions_failed_total",
        "Total transaction broadcasts that reported an error",
        &["chain_id"]
    )
    .unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> BridgeResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| BridgeError::Internal(format!("Metrics bind failed: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| BridgeError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_chain_height(chain_id: u64, height: u64) {
    CHAIN_HEIGHT
        .with_label_values(&[&chain_id.to_string()])
        .set(height as f64);
}

pub fn record_chain_available(chain_id: u64, available: bool) {
    CHAIN_AVAILABLE
        .with_label_values(&[&chain_id.to_string()])
        .set(if available { 1.0 } else { 0.0 });
}

pub fn record_probe_failure(chain_id: u64) {
    PROBE_FAILURES
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_submitted(chain_id: u64) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_failed(chain_id: u64) {
    TX_FAILED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}
