//! Prometheus metrics for quire-server.
//!
//! Exposes server metrics in Prometheus format at the `/metrics` endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder and return a handle for rendering.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "quire_rpc_requests_total",
        "Total number of RPC requests processed"
    );
    describe_histogram!(
        "quire_rpc_request_duration_seconds",
        "Duration of RPC requests in seconds"
    );
    describe_counter!(
        "quire_rpc_errors_total",
        "Total number of RPC errors by status code"
    );

    Ok(handle)
}

/// Record a successful RPC.
pub fn record_rpc_request(method: &str, duration: std::time::Duration) {
    counter!("quire_rpc_requests_total", "method" => method.to_owned(), "status" => "ok")
        .increment(1);
    histogram!("quire_rpc_request_duration_seconds", "method" => method.to_owned())
        .record(duration.as_secs_f64());
}

/// Record a failed RPC.
pub fn record_rpc_error(method: &str, code: &str) {
    counter!("quire_rpc_requests_total", "method" => method.to_owned(), "status" => "error")
        .increment(1);
    counter!("quire_rpc_errors_total", "method" => method.to_owned(), "code" => code.to_owned())
        .increment(1);
}

/// Times a request and records metrics on completion.
pub struct RequestTimer {
    method: String,
    start: Instant,
}

impl RequestTimer {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            start: Instant::now(),
        }
    }

    pub fn success(self) {
        record_rpc_request(&self.method, self.start.elapsed());
    }

    pub fn error(self, code: &str) {
        record_rpc_error(&self.method, code);
    }
}
