//! Configuration validation.
//!
//! Semantic validation on top of serde's syntactic checks. Runs before a
//! config is accepted into the system and returns all violations, not just
//! the first.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single validation failure, pointing at the offending field.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_probability(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError {
            field,
            message: format!("probability {value} must be within [0, 1]"),
        });
    }
}

fn check_range(errors: &mut Vec<ValidationError>, field: &'static str, range: [u64; 2]) {
    if range[0] > range[1] {
        errors.push(ValidationError {
            field,
            message: format!("range [{}, {}] has lower bound above upper bound", range[0], range[1]),
        });
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.is_empty() {
        errors.push(ValidationError {
            field: "service.name",
            message: "must not be empty".to_string(),
        });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("'{}' is not a valid socket address", config.listener.bind_address),
        });
    }

    if config.exporter.enabled && config.exporter.endpoint.is_empty() {
        errors.push(ValidationError {
            field: "exporter.endpoint",
            message: "must not be empty when the exporter is enabled".to_string(),
        });
    }
    if config.exporter.batch_size == 0 {
        errors.push(ValidationError {
            field: "exporter.batch_size",
            message: "must be at least 1".to_string(),
        });
    }
    if config.exporter.queue_size == 0 {
        errors.push(ValidationError {
            field: "exporter.queue_size",
            message: "must be at least 1".to_string(),
        });
    }

    check_range(&mut errors, "workload.home_delay_ms", config.workload.home_delay_ms);
    check_range(&mut errors, "workload.db_delay_ms", config.workload.db_delay_ms);
    check_probability(
        &mut errors,
        "workload.db_error_probability",
        config.workload.db_error_probability,
    );
    check_probability(
        &mut errors,
        "workload.slow_query_probability",
        config.workload.slow_query_probability,
    );
    check_probability(
        &mut errors,
        "workload.write_error_probability",
        config.workload.write_error_probability,
    );
    if config.workload.simulated_row_max == 0 {
        errors.push(ValidationError {
            field: "workload.simulated_row_max",
            message: "must be at least 1".to_string(),
        });
    }

    if url::Url::parse(&config.downstream.url).is_err() {
        errors.push(ValidationError {
            field: "downstream.url",
            message: format!("'{}' is not a valid URL", config.downstream.url),
        });
    }
    if config.downstream.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "downstream.timeout_ms",
            message: "must be at least 1".to_string(),
        });
    }

    if config.load_test.calls == 0 {
        errors.push(ValidationError {
            field: "load_test.calls",
            message: "must be at least 1".to_string(),
        });
    }
    if config.load_test.call_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "load_test.call_timeout_ms",
            message: "must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
