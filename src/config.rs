use crate::output::OutputTarget;
use crate::render::OutputFormat;
use crate::sampler::{RetryPolicy, SamplerConfig};
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT_FILE: &str = "/tmp/containerlog";
const DEFAULT_INTERVAL_SECS: u64 = 10;
/// One day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Sample CPU and memory usage of one running container at a fixed interval.
#[derive(Debug, Default, Parser)]
#[command(name = "containerlog", version, about, long_about = None)]
pub struct Cli {
    /// Name or ID of the container to monitor
    #[arg(long, short, env = "PROBE_CONTAINER")]
    pub container: Option<String>,

    /// Output format [default: json]
    #[arg(long, short)]
    pub output_format: Option<OutputFormat>,

    /// Collection interval in seconds [default: 10]
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Output file; an empty string writes to stdout [default: /tmp/containerlog]
    #[arg(long, short)]
    pub file: Option<String>,

    /// Stop after this many samples
    #[arg(long = "count", short = 'n')]
    pub count: Option<u64>,

    /// Retries for a failed stats fetch before giving up [default: 3]
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Delay before the first retry, doubled on each further retry [default: 500]
    #[arg(long)]
    pub retry_backoff_ms: Option<u64>,

    /// TOML file providing defaults for the options above
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Optional TOML defaults. Every key is optional; command-line flags win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub container: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub interval: Option<u64>,
    pub file: Option<String>,
    pub count: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

/// Fully resolved and validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub container: String,
    pub output_format: OutputFormat,
    pub interval_secs: u64,
    pub output: OutputTarget,
    pub count: Option<u64>,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl ProbeConfig {
    /// Resolves the process arguments, reading `--config` / `CONFIG_FILE` if given.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                let s = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config file {}", path.display()))?;
                toml::from_str(&s)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Parse and validate config from a TOML string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let file: FileConfig = toml::from_str(s)?;
        Self::resolve(Cli::default(), file)
    }

    /// Merges command line over file values over built-in defaults, then validates.
    pub fn resolve(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let container = cli
            .container
            .or(file.container)
            .ok_or_else(|| anyhow::anyhow!("--container is required"))?;
        let config = ProbeConfig {
            container,
            output_format: cli.output_format.or(file.output_format).unwrap_or_default(),
            interval_secs: cli
                .interval
                .or(file.interval)
                .unwrap_or(DEFAULT_INTERVAL_SECS),
            output: OutputTarget::from_path(
                cli.file
                    .or(file.file)
                    .as_deref()
                    .unwrap_or(DEFAULT_OUTPUT_FILE),
            ),
            count: cli.count.or(file.count),
            max_retries: cli
                .max_retries
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            retry_backoff_ms: cli
                .retry_backoff_ms
                .or(file.retry_backoff_ms)
                .unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.container.trim().is_empty(),
            "container must be non-empty"
        );
        anyhow::ensure!(
            self.interval_secs > 0,
            "interval must be > 0, got {}",
            self.interval_secs
        );
        anyhow::ensure!(
            self.interval_secs <= MAX_INTERVAL_SECS,
            "interval must be <= {}, got {}",
            MAX_INTERVAL_SECS,
            self.interval_secs
        );
        anyhow::ensure!(
            self.retry_backoff_ms > 0 || self.max_retries == 0,
            "retry_backoff_ms must be > 0 when max_retries is set, got {}",
            self.retry_backoff_ms
        );
        Ok(())
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_samples: self.count,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            },
        }
    }
}
