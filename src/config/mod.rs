//! Configuration subsystem: schema, loading, validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, DownstreamConfig, ExporterConfig, ListenerConfig, LoadTestConfig,
    ObservabilityConfig, ServiceConfig, WorkloadConfig,
};
pub use validation::{validate_config, ValidationError};
