// Shared test helpers

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use containerlog::docker_repo::StatsSource;
use containerlog::error::FetchError;
use containerlog::models::RawSnapshot;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MIB: u64 = 1024 * 1024;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::TimeDelta::seconds(secs)
}

pub fn snapshot(secs: i64, cpu: u64, mem: u64, limit: u64) -> RawSnapshot {
    RawSnapshot {
        observed_at: at(secs),
        cpu_total_usage_nanos: cpu,
        memory_usage_bytes: mem,
        memory_limit_bytes: limit,
    }
}

/// Replays a fixed list of fetch results, then reports the container as gone.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<RawSnapshot, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<RawSnapshot, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatsSource for ScriptedSource {
    async fn fetch(&self, container: &str) -> Result<RawSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(FetchError::NotFound {
                container: container.to_string(),
                message: "script exhausted".into(),
            })
        })
    }
}

/// Produces an endless, evenly spaced series: +1 CPU-second per 10 s tick.
pub struct SteadySource {
    calls: AtomicUsize,
}

impl SteadySource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl StatsSource for SteadySource {
    async fn fetch(&self, _container: &str) -> Result<RawSnapshot, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(snapshot(
            n as i64 * 10,
            n * 1_000_000_000,
            50 * MIB,
            100 * MIB,
        ))
    }
}

pub fn transient(container: &str) -> FetchError {
    FetchError::from_docker(container, bollard::errors::Error::RequestTimeoutError)
}

/// Answers the baseline request, then never completes another fetch.
pub struct HangingSource {
    calls: AtomicUsize,
}

impl HangingSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl StatsSource for HangingSource {
    async fn fetch(&self, _container: &str) -> Result<RawSnapshot, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(snapshot(0, 0, MIB, 2 * MIB));
        }
        std::future::pending().await
    }
}

/// Like `SteadySource`, but the first tick's fetch takes `delay`. Records the
/// paused-clock offset at which every fetch started.
pub struct SlowFirstTickSource {
    origin: tokio::time::Instant,
    delay: std::time::Duration,
    starts: Mutex<Vec<std::time::Duration>>,
}

impl SlowFirstTickSource {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            delay,
            starts: Mutex::new(Vec::new()),
        }
    }

    pub fn start_offsets_secs(&self) -> Vec<u64> {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.as_secs())
            .collect()
    }
}

impl StatsSource for SlowFirstTickSource {
    async fn fetch(&self, _container: &str) -> Result<RawSnapshot, FetchError> {
        let n = {
            let mut starts = self.starts.lock().unwrap();
            starts.push(self.origin.elapsed());
            starts.len() as u64 - 1
        };
        if n == 1 {
            tokio::time::sleep(self.delay).await;
        }
        Ok(snapshot(
            self.origin.elapsed().as_secs() as i64,
            n * 1_000_000_000,
            50 * MIB,
            100 * MIB,
        ))
    }
}
