//! Delay and failure policy for the simulated workload.
//!
//! The policy is the only source of randomness in the request path. It is a
//! trait so tests can substitute deterministic plans for the configured
//! random draws.

use std::time::Duration;

use rand::Rng;

use crate::config::WorkloadConfig;

/// Operations the policy can plan work for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Home,
    DatabaseQuery,
}

/// One planned unit of simulated work.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    /// Base delay emulating the operation's latency.
    pub delay: Duration,
    /// Whether the operation fails.
    pub fail: bool,
    /// Extra delay for an outlier slow operation. Not a failure.
    pub slow_extra: Option<Duration>,
    /// Simulated number of rows touched.
    pub rows: u32,
}

impl WorkPlan {
    /// An instant, always-successful plan. Useful as a test baseline.
    pub fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: false,
            slow_extra: None,
            rows: 1,
        }
    }
}

/// Decides how each simulated operation behaves.
pub trait WorkPolicy: Send + Sync {
    /// Plan one operation's delay, failure and outcome.
    fn plan(&self, op: OpKind) -> WorkPlan;

    /// Independent failure decision for the POST /api/data write path.
    fn inject_write_failure(&self) -> bool;
}

/// Production policy: draws from the configured ranges and probabilities.
pub struct RandomPolicy {
    config: WorkloadConfig,
}

impl RandomPolicy {
    pub fn new(mut config: WorkloadConfig) -> Self {
        // gen_bool panics outside [0, 1]; validation rejects such configs
        // before they get here, defaults included.
        config.db_error_probability = config.db_error_probability.clamp(0.0, 1.0);
        config.slow_query_probability = config.slow_query_probability.clamp(0.0, 1.0);
        config.write_error_probability = config.write_error_probability.clamp(0.0, 1.0);
        Self { config }
    }

    fn delay_from(range: [u64; 2]) -> Duration {
        let millis = if range[0] >= range[1] {
            range[0]
        } else {
            rand::thread_rng().gen_range(range[0]..=range[1])
        };
        Duration::from_millis(millis)
    }
}

impl WorkPolicy for RandomPolicy {
    fn plan(&self, op: OpKind) -> WorkPlan {
        match op {
            OpKind::Home => WorkPlan {
                delay: Self::delay_from(self.config.home_delay_ms),
                fail: false,
                slow_extra: None,
                rows: 0,
            },
            OpKind::DatabaseQuery => {
                let mut rng = rand::thread_rng();
                WorkPlan {
                    delay: Self::delay_from(self.config.db_delay_ms),
                    fail: rng.gen_bool(self.config.db_error_probability),
                    slow_extra: rng
                        .gen_bool(self.config.slow_query_probability)
                        .then(|| Duration::from_millis(self.config.slow_query_extra_ms)),
                    rows: rng.gen_range(1..=self.config.simulated_row_max.max(1)),
                }
            }
        }
    }

    fn inject_write_failure(&self) -> bool {
        rand::thread_rng().gen_bool(self.config.write_error_probability)
    }
}

/// Deterministic policy for tests.
pub struct FixedPolicy {
    pub plan: WorkPlan,
    pub write_failure: bool,
}

impl FixedPolicy {
    pub fn instant() -> Self {
        Self {
            plan: WorkPlan::instant(),
            write_failure: false,
        }
    }
}

impl WorkPolicy for FixedPolicy {
    fn plan(&self, _op: OpKind) -> WorkPlan {
        self.plan.clone()
    }

    fn inject_write_failure(&self) -> bool {
        self.write_failure
    }
}
