//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Service identity used in exported telemetry.
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Telemetry export settings (span/metric collector).
    pub exporter: ExporterConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Simulated-workload constants (delays, probabilities).
    pub workload: WorkloadConfig,

    /// Downstream dependency called by GET /api/data.
    pub downstream: DownstreamConfig,

    /// Load-test endpoint settings.
    pub load_test: LoadTestConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name identifying this process in exported telemetry and logs.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "beacon".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds (whole request/response cycle).
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Telemetry exporter configuration.
///
/// The exporter ships finished spans and periodic metric snapshots to a
/// remote collector. Export is best-effort: failures never surface on the
/// request path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Enable the background exporter.
    pub enabled: bool,

    /// Collector endpoint as host:port.
    pub endpoint: String,

    /// Number of spans that triggers an early batch flush.
    pub batch_size: usize,

    /// Interval between periodic flushes in milliseconds.
    pub flush_interval_ms: u64,

    /// Capacity of the in-process span queue. When full, new spans are
    /// dropped rather than blocking the request that produced them.
    pub queue_size: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "otel-collector:4317".to_string(),
            batch_size: 64,
            flush_interval_ms: 5000,
            queue_size: 2048,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). Overridden by RUST_LOG.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Constants driving the simulated workload.
///
/// These are configuration, not algorithmic content: the generators read
/// whatever is configured here, and tests substitute fixed plans instead of
/// random draws.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Home-operation sleep range in milliseconds, inclusive.
    pub home_delay_ms: [u64; 2],

    /// Database-query sleep range in milliseconds, inclusive.
    pub db_delay_ms: [u64; 2],

    /// Probability that a database query fails, in [0, 1].
    pub db_error_probability: f64,

    /// Probability that a database query is an outlier "slow query".
    /// Independent of the failure probability; a slow query is not an error.
    pub slow_query_probability: f64,

    /// Extra delay added to a slow query, in milliseconds.
    pub slow_query_extra_ms: u64,

    /// Probability that a POST /api/data write fails. Independent of the
    /// database query's own failure probability.
    pub write_error_probability: f64,

    /// Upper bound for the simulated row count (lower bound is 1).
    pub simulated_row_max: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            home_delay_ms: [50, 150],
            db_delay_ms: [50, 200],
            db_error_probability: 0.1,
            slow_query_probability: 0.05,
            slow_query_extra_ms: 400,
            write_error_probability: 0.2,
            simulated_row_max: 100,
        }
    }
}

/// Downstream dependency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// URL of the external service GET /api/data calls.
    pub url: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://httpbin.org/delay/0.1".to_string(),
            timeout_ms: 1000,
        }
    }
}

/// Load-test endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Number of sequential internal calls per GET /load-test.
    pub calls: usize,

    /// Deadline for each individual call in milliseconds. A timed-out call
    /// is reported as failed; the remaining calls still run.
    pub call_timeout_ms: u64,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            calls: 10,
            call_timeout_ms: 2000,
        }
    }
}
