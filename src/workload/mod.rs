//! Simulated workload: pluggable delay/failure policy and the generators
//! that exercise the tracing, metrics and logging pipeline.

pub mod generator;
pub mod policy;

pub use generator::{database_query, home_work, HomeOutcome, QueryOutcome, WorkError};
pub use policy::{FixedPolicy, OpKind, RandomPolicy, WorkPlan, WorkPolicy};
