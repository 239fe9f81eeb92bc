//! Prometheus metrics recording and endpoint.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus metrics recorder and return the handle for rendering.
///
/// Fails if a global recorder is already installed in this process.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Record one endpoint request with its outcome and duration.
pub fn record_request(endpoint: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("canvas_requests_total", &labels).increment(1);
    let labels = [("endpoint", endpoint.to_string())];
    metrics::histogram!("canvas_request_duration_seconds", &labels).record(duration_secs);
}

/// Record the number of commands returned by a provider.
pub fn record_commands(provider: &str, count: usize) {
    let labels = [("provider", provider.to_string())];
    metrics::counter!("canvas_commands_total", &labels).increment(count as u64);
}

/// Record an error of a given kind.
pub fn record_error(kind: &str) {
    let labels = [("kind", kind.to_string())];
    metrics::counter!("errors_total", &labels).increment(1);
}
