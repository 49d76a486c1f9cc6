//! Metrics collection and exposition.
//!
//! # Metrics
//! - `app_request_count_total` (counter): completed requests by method,
//!   endpoint and status.
//! - `app_request_latency_seconds` (histogram): request latency distribution
//!   by method and endpoint.
//!
//! Series are created lazily on first observation and never deleted; updates
//! are atomic, so concurrent requests on the same series never lose counts.
//! The rendered exposition text is a consistent point-in-time snapshot
//! served by GET /metrics.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUEST_COUNT: &str = "app_request_count_total";
pub const REQUEST_LATENCY: &str = "app_request_latency_seconds";

/// Exposition content type for the /metrics endpoint.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Buckets tuned for the simulated workload: tens of milliseconds for the
/// fast path, up to a few seconds for slow-query outliers and timeouts.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn configured_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_LATENCY.to_string()), LATENCY_BUCKETS)
}

fn describe() {
    describe_counter!(
        REQUEST_COUNT,
        "Completed requests by method, endpoint and HTTP status."
    );
    describe_histogram!(
        REQUEST_LATENCY,
        Unit::Seconds,
        "Request latency by method and endpoint."
    );
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = configured_builder()?.install_recorder()?;
    describe();
    Ok(handle)
}

/// Record one completed request: exactly one counter increment and one
/// histogram observation.
pub fn record_request(method: &str, endpoint: &str, status: u16, elapsed: Duration) {
    counter!(
        REQUEST_COUNT,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "http_status" => status.to_string()
    )
    .increment(1);
    histogram!(
        REQUEST_LATENCY,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(elapsed.as_secs_f64());
}
