//! Prometheus metrics exposition
//!
//! The client crate records the `twitter_*` series; the harvester adds:
//!
//! - `harvester_items_written_total` (counter): label `job`

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global Prometheus recorder with an HTTP listener serving
/// `/metrics` on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to install Prometheus exporter on {addr}"))
}

/// Count one item written to the output.
pub fn record_written(job: &'static str) {
    metrics::counter!("harvester_items_written_total", "job" => job).increment(1);
}
