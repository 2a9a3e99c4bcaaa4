// Sample data model: raw runtime snapshot in, derived sample out.

use chrono::{DateTime, Utc};

/// One raw stats reading for a container, as returned by a [`StatsSource`](crate::docker_repo::StatsSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSnapshot {
    pub observed_at: DateTime<Utc>,
    /// Cumulative CPU time consumed by the container since its own start.
    pub cpu_total_usage_nanos: u64,
    pub memory_usage_bytes: u64,
    /// Current memory ceiling; 0 when the runtime reports no limit.
    pub memory_limit_bytes: u64,
}

/// Start and previous-tick references threaded through the sampling loop.
///
/// Owned by the loop; [`derive`](crate::derive::derive) only reads it and
/// [`SessionState::advance`] is called once the sample has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub start_time: DateTime<Utc>,
    pub start_cpu_usage_nanos: u64,
    pub previous_time: DateTime<Utc>,
    pub previous_cpu_usage_nanos: u64,
}

/// Data-quality conditions detected while deriving a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// Observation is not after the session start; since-start CPU percentage unavailable.
    NonPositiveElapsed,
    /// Observation is not after the previous one; this-interval CPU percentage unavailable.
    NonPositiveInterval,
    /// Cumulative CPU counter went backwards (e.g. container restarted under the same name).
    CounterRegression,
    /// Runtime reported a zero memory limit; memory percentage unavailable.
    NoMemoryLimit,
}

impl Anomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::NonPositiveElapsed => "non_positive_elapsed",
            Anomaly::NonPositiveInterval => "non_positive_interval",
            Anomaly::CounterRegression => "counter_regression",
            Anomaly::NoMemoryLimit => "no_memory_limit",
        }
    }
}

/// Metrics for one tick. Percentages are `None` when they cannot be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSample {
    pub timestamp: DateTime<Utc>,
    pub elapsed_since_start_secs: f64,
    pub cpu_secs_since_start: f64,
    pub cpu_percent_since_start: Option<f64>,
    pub cpu_percent_this_interval: Option<f64>,
    pub memory_usage_mib: f64,
    pub memory_percent: Option<f64>,
    pub anomalies: Vec<Anomaly>,
}
