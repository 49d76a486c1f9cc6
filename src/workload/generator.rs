//! Simulated work generators.
//!
//! Each generator models one unit of work as a nested span: it logs at start
//! and completion, sleeps for the planned duration (yielding, so concurrent
//! requests proceed), and applies the plan's failure or slow-outlier
//! decision to its span before reporting the outcome upward.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::telemetry::{AttrValue, Tracer};
use crate::workload::policy::{OpKind, WorkPolicy};

/// Failure produced by a generator's injected error.
#[derive(Debug, Error)]
pub enum WorkError {
    #[error("simulated internal server error")]
    SimulatedDb,
}

/// Outcome of a successful database query simulation.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub rows: u32,
    pub elapsed: Duration,
}

/// Outcome of the home operation.
#[derive(Debug, Clone)]
pub struct HomeOutcome {
    pub elapsed: Duration,
}

/// Simulate the home page's unit of work.
pub async fn home_work(tracer: &Tracer, policy: &dyn WorkPolicy) -> HomeOutcome {
    let plan = policy.plan(OpKind::Home);
    let mut span = tracer.start_span("home-operation");
    tracing::info!("serving home page");

    let started = Instant::now();
    tokio::time::sleep(plan.delay).await;
    let elapsed = started.elapsed();

    span.set_attribute("work.duration_ms", elapsed.as_millis() as u64);
    HomeOutcome { elapsed }
}

/// Simulate one database query under its own child span.
pub async fn database_query(
    tracer: &Tracer,
    policy: &dyn WorkPolicy,
) -> Result<QueryOutcome, WorkError> {
    let plan = policy.plan(OpKind::DatabaseQuery);
    let mut span = tracer.start_span("database-query");
    span.set_attribute("db.system", "simulated");
    span.set_attribute("db.statement", "SELECT * FROM sample_records");
    tracing::info!("running simulated database query");

    let started = Instant::now();
    tokio::time::sleep(plan.delay).await;

    if let Some(extra) = plan.slow_extra {
        tokio::time::sleep(extra).await;
        span.add_event(
            "slow_query",
            vec![(
                "delay_ms".to_string(),
                AttrValue::Int(extra.as_millis() as i64),
            )],
        );
        tracing::warn!(extra_ms = extra.as_millis() as u64, "slow query simulated");
    }

    if plan.fail {
        let err = WorkError::SimulatedDb;
        span.record_exception(&err);
        tracing::error!(error = %err, "simulated database failure");
        return Err(err);
    }

    let elapsed = started.elapsed();
    span.set_attribute("db.row_count", u64::from(plan.rows));
    tracing::info!(rows = plan.rows, "database query finished");
    Ok(QueryOutcome {
        rows: plan.rows,
        elapsed,
    })
}
