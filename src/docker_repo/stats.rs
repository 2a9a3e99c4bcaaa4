// Map a raw Docker stats API response onto a RawSnapshot.

use crate::models::RawSnapshot;
use bollard::models::ContainerStatsResponse;
use chrono::{DateTime, Utc};

/// Extracts the counters the sampler needs. Returns `None` when the cumulative
/// CPU counter is missing; memory fields default to 0 (0 limit = unlimited).
pub(crate) fn process_statistics(
    s: &ContainerStatsResponse,
    observed_at: DateTime<Utc>,
) -> Option<RawSnapshot> {
    let cpu_total_usage_nanos = s
        .cpu_stats
        .as_ref()?
        .cpu_usage
        .as_ref()?
        .total_usage?;

    let memory_usage_bytes = s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);
    let memory_limit_bytes = s.memory_stats.as_ref().and_then(|m| m.limit).unwrap_or(0);

    Some(RawSnapshot {
        observed_at,
        cpu_total_usage_nanos,
        memory_usage_bytes,
        memory_limit_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats};

    fn cpu_stats(total_usage: Option<u64>) -> ContainerCpuStats {
        ContainerCpuStats {
            cpu_usage: Some(ContainerCpuUsage {
                total_usage,
                ..Default::default()
            }),
            system_cpu_usage: Some(1_000_000),
            online_cpus: Some(2),
            throttling_data: None,
        }
    }

    #[test]
    fn process_statistics_returns_none_when_cpu_stats_missing() {
        let s = ContainerStatsResponse {
            cpu_stats: None,
            ..Default::default()
        };
        assert!(process_statistics(&s, Utc::now()).is_none());
    }

    #[test]
    fn process_statistics_returns_none_when_total_usage_missing() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(None)),
            ..Default::default()
        };
        assert!(process_statistics(&s, Utc::now()).is_none());
    }

    #[test]
    fn process_statistics_reads_cpu_and_memory() {
        let now = Utc::now();
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(Some(3_000_000_000))),
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(120 * 1024 * 1024),
                limit: Some(200 * 1024 * 1024),
                max_usage: Some(150 * 1024 * 1024),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = process_statistics(&s, now).unwrap();
        assert_eq!(out.observed_at, now);
        assert_eq!(out.cpu_total_usage_nanos, 3_000_000_000);
        assert_eq!(out.memory_usage_bytes, 120 * 1024 * 1024);
        assert_eq!(out.memory_limit_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn process_statistics_defaults_missing_memory_to_zero() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(Some(1))),
            memory_stats: None,
            ..Default::default()
        };
        let out = process_statistics(&s, Utc::now()).unwrap();
        assert_eq!(out.memory_usage_bytes, 0);
        assert_eq!(out.memory_limit_bytes, 0);
    }
}
