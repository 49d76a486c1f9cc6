//! Telemetry subsystem: tracing, metrics, correlated logging, export.
//!
//! # Data Flow
//! ```text
//! request middleware
//!     → tracer.rs   (root span + current-span scope for the request task)
//!     → handlers and workload generators open child spans
//!     → logging.rs  (every event stamped with the current trace/span ids)
//!     → metrics.rs  (counter + histogram on request completion)
//!
//! Consumers:
//!     → export.rs   (span batches and metric snapshots to the collector)
//!     → GET /metrics (Prometheus exposition snapshot)
//!     → stdout      (JSON log lines for aggregation)
//! ```
//!
//! The tracer, metrics handle and export queue are constructed once at
//! startup and threaded through the application state; there is no ad hoc
//! global telemetry singleton beyond the `metrics` recorder the facade
//! crate requires.

pub mod export;
pub mod logging;
pub mod metrics;
pub mod span;
pub mod tracer;

pub use span::{AttrValue, SpanContext, SpanEvent, SpanId, SpanRecord, SpanStatus, TraceId};
pub use tracer::{current_span, ScopedSpan, Tracer};
