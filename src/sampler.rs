// Sampling loop: fixed-interval fetch -> derive -> write for one container.
// The session state lives on this task's stack and is advanced only after the
// sample for a tick has been written.

use crate::derive::derive;
use crate::docker_repo::StatsSource;
use crate::error::FetchError;
use crate::models::{RawSnapshot, SessionState};
use crate::output::SampleWriter;
use tokio::io::AsyncWrite;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::instrument;

/// Upper bound for a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry budget for retryable fetch failures. `max_retries == 0` is fail-fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): doubles each time, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

pub struct SamplerConfig {
    pub interval: Duration,
    /// Stop after this many samples; run until shutdown when `None`.
    pub max_samples: Option<u64>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSummary {
    pub samples_written: u64,
}

/// Runs the loop until shutdown, the sample limit, or a fatal error.
///
/// A baseline reading opens the session and is not emitted; the first sample
/// follows one interval later. Fetch and output errors end the run; derivation
/// anomalies are logged and the sample is written with sentinel values.
/// The writer is left open so the caller can finish it on every exit path.
#[instrument(
    name = "sampler",
    skip(source, writer, config, shutdown_rx),
    fields(interval_secs = config.interval.as_secs())
)]
pub async fn run<S, W>(
    source: &S,
    container: &str,
    writer: &mut SampleWriter<W>,
    config: SamplerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> anyhow::Result<SamplerSummary>
where
    S: StatsSource,
    W: AsyncWrite + Unpin,
{
    let first_record = writer.records_written();
    let summary = |writer: &SampleWriter<W>| SamplerSummary {
        samples_written: writer.records_written() - first_record,
    };

    let baseline = tokio::select! {
        res = fetch_with_retry(source, container, &config.retry) => res?,
        _ = &mut shutdown_rx => {
            tracing::debug!("Sampler shutting down before baseline");
            return Ok(summary(writer));
        }
    };
    let mut session = SessionState::start(&baseline);
    writer.write_header().await?;
    tracing::info!(
        container,
        cpu_total_usage_nanos = baseline.cpu_total_usage_nanos,
        "baseline sample taken"
    );

    if config.max_samples == Some(0) {
        return Ok(summary(writer));
    }

    let first_tick = Instant::now().checked_add(config.interval).ok_or_else(|| {
        anyhow::anyhow!(
            "interval of {}s is too large to schedule",
            config.interval.as_secs()
        )
    })?;
    let mut tick = interval_at(first_tick, config.interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown_rx => {
                tracing::debug!("Sampler shutting down");
                break;
            }
        }

        // A hung daemon or a backoff sleep must not hold up shutdown.
        let raw = tokio::select! {
            res = fetch_with_retry(source, container, &config.retry) => res?,
            _ = &mut shutdown_rx => {
                tracing::debug!("Sampler shutting down during fetch");
                break;
            }
        };
        let sample = derive(&raw, &session);
        if !sample.anomalies.is_empty() {
            let anomalies: Vec<&str> = sample.anomalies.iter().map(|a| a.as_str()).collect();
            tracing::warn!(
                container,
                anomalies = ?anomalies,
                "sample has values that could not be derived normally"
            );
        }
        writer.write_sample(&sample).await?;
        session.advance(&raw);
        let samples_written = writer.records_written() - first_record;
        tracing::debug!(
            operation = "write_sample",
            samples_written,
            cpu_percent_this_interval = ?sample.cpu_percent_this_interval,
            memory_usage_mib = sample.memory_usage_mib,
            "Sample written"
        );

        if config.max_samples.is_some_and(|max| samples_written >= max) {
            tracing::info!(samples_written, "sample limit reached");
            break;
        }
    }

    Ok(summary(writer))
}

/// Fetches once, retrying retryable failures with exponential backoff.
pub async fn fetch_with_retry<S: StatsSource>(
    source: &S,
    container: &str,
    policy: &RetryPolicy,
) -> Result<RawSnapshot, FetchError> {
    let mut attempt = 0;
    loop {
        match source.fetch(container).await {
            Ok(raw) => return Ok(raw),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    error = %e,
                    operation = "fetch_stats",
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "stats fetch failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
