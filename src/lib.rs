//! Beacon: a request-handling service instrumented end-to-end.
//!
//! Every inbound request produces a tree of trace spans, updates counters
//! and histograms, and emits JSON logs carrying the active trace/span ids,
//! so traces, metrics and logs can be cross-referenced for one request.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────┐
//!                   │                   BEACON                      │
//!    Request        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!    ───────────────┼─▶│   http   │──▶│   api    │──▶│ workload │  │
//!                   │  │ server + │   │ handlers │   │ policy + │  │
//!                   │  │middleware│   │          │   │generators│  │
//!                   │  └────┬─────┘   └────┬─────┘   └────┬─────┘  │
//!                   │       │              │              │        │
//!                   │       ▼              ▼              ▼        │
//!                   │  ┌──────────────────────────────────────┐    │
//!                   │  │              telemetry               │    │
//!                   │  │  tracer · metrics · logging · export │    │
//!                   │  └──────────────────────────────────────┘    │
//!                   │       │                                      │
//!                   │       ▼ span batches, metric snapshots       │
//!                   └───────┼──────────────────────────────────────┘
//!                           ▼
//!                     collector endpoint
//! ```

// Core subsystems
pub mod api;
pub mod config;
pub mod http;

// Simulated workload and its collaborators
pub mod downstream;
pub mod workload;

// Cross-cutting concerns
pub mod lifecycle;
pub mod telemetry;

pub use config::AppConfig;
pub use http::AppServer;
pub use lifecycle::Shutdown;
