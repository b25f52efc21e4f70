//! Prometheus metrics.
//!
//! A library has no business binding its own `/metrics` listener — that's
//! an application concern — so this module stops at exposing the registered
//! collectors and a [`metrics_text`] exposition function the embedding
//! application wires into whatever HTTP server it already runs.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_gauge, register_histogram, Counter, Encoder, Gauge, Histogram,
    TextEncoder,
};

lazy_static! {
    pub static ref DROPPED_LOGS_TOTAL: Counter = register_counter!(
        "log_shipper_dropped_logs_total",
        "Total number of logs dropped by admission control"
    )
    .unwrap();
    pub static ref DRAIN_ATTEMPTS_TOTAL: Counter = register_counter!(
        "log_shipper_drain_attempts_total",
        "Total number of batch send attempts, including retries"
    )
    .unwrap();
    pub static ref QUEUE_LENGTH: Gauge = register_gauge!(
        "log_shipper_queue_length",
        "Current queue length in items"
    )
    .unwrap();
    pub static ref BATCH_BYTES: Histogram = register_histogram!(
        "log_shipper_batch_bytes",
        "Size in bytes of batches posted to the collector endpoint",
        vec![1024.0, 16384.0, 131072.0, 1048576.0, 3145728.0]
    )
    .unwrap();
}

/// Render all registered collectors in Prometheus text exposition format,
/// for an embedding application to serve from its own `/metrics` endpoint.
pub fn metrics_text() -> String {
    let metric_families = prometheus::gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "metrics: failed to encode prometheus text format");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_contains_registered_metric_names() {
        DROPPED_LOGS_TOTAL.inc();
        let text = metrics_text();
        assert!(text.contains("log_shipper_dropped_logs_total"));
    }
}
