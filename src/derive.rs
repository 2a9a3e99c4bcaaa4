// Derive per-tick CPU and memory utilization from cumulative counters.

use crate::models::{Anomaly, DerivedSample, RawSnapshot, SessionState};
use chrono::{DateTime, Utc};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;
const BYTES_PER_MIB: f64 = 1024.0;

impl SessionState {
    /// Opens a session whose start and previous references are both `raw`.
    pub fn start(raw: &RawSnapshot) -> Self {
        Self {
            start_time: raw.observed_at,
            start_cpu_usage_nanos: raw.cpu_total_usage_nanos,
            previous_time: raw.observed_at,
            previous_cpu_usage_nanos: raw.cpu_total_usage_nanos,
        }
    }

    /// Moves the previous-tick reference to `raw`. Start references never change.
    pub fn advance(&mut self, raw: &RawSnapshot) {
        self.previous_time = raw.observed_at;
        self.previous_cpu_usage_nanos = raw.cpu_total_usage_nanos;
    }
}

/// Computes the sample for `raw` against the session references. Pure: the
/// caller advances the session after the sample has been consumed.
pub fn derive(raw: &RawSnapshot, session: &SessionState) -> DerivedSample {
    let mut anomalies = Vec::new();

    let elapsed_nanos = nanos_between(session.start_time, raw.observed_at);
    let interval_nanos = nanos_between(session.previous_time, raw.observed_at);

    let cpu_since_start = counter_delta(raw.cpu_total_usage_nanos, session.start_cpu_usage_nanos);
    let cpu_this_interval =
        counter_delta(raw.cpu_total_usage_nanos, session.previous_cpu_usage_nanos);
    if cpu_since_start < 0 || cpu_this_interval < 0 {
        anomalies.push(Anomaly::CounterRegression);
    }

    let cpu_percent_since_start = cpu_percent(cpu_since_start, elapsed_nanos);
    if cpu_percent_since_start.is_none() {
        anomalies.push(Anomaly::NonPositiveElapsed);
    }
    let cpu_percent_this_interval = cpu_percent(cpu_this_interval, interval_nanos);
    if cpu_percent_this_interval.is_none() {
        anomalies.push(Anomaly::NonPositiveInterval);
    }

    let memory_usage_mib = to_mib(raw.memory_usage_bytes);
    let memory_percent = if raw.memory_limit_bytes == 0 {
        anomalies.push(Anomaly::NoMemoryLimit);
        None
    } else {
        // Ratio taken in MiB, not bytes; keeps rounding identical at extreme sizes.
        Some(memory_usage_mib / to_mib(raw.memory_limit_bytes) * 100.0)
    };

    DerivedSample {
        timestamp: raw.observed_at,
        elapsed_since_start_secs: elapsed_nanos as f64 / NANOS_PER_SEC,
        cpu_secs_since_start: cpu_since_start as f64 / NANOS_PER_SEC,
        cpu_percent_since_start,
        cpu_percent_this_interval,
        memory_usage_mib,
        memory_percent,
        anomalies,
    }
}

/// CPU time as a percentage of one core's worth of wall time. `None` unless wall time > 0.
fn cpu_percent(cpu_nanos: i128, wall_nanos: i64) -> Option<f64> {
    (wall_nanos > 0).then(|| cpu_nanos as f64 / wall_nanos as f64 * 100.0)
}

fn counter_delta(current: u64, reference: u64) -> i128 {
    i128::from(current) - i128::from(reference)
}

fn nanos_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let delta = to - from;
    delta.num_nanoseconds().unwrap_or(if delta < chrono::TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB / BYTES_PER_MIB
}
