// Line renderers for derived samples.
//
// Every numeric field is printed with two decimals. Percentages that could not
// be computed render as `null` (json) or an empty field (csv).

use crate::models::DerivedSample;
use chrono::SecondsFormat;
use serde::Deserialize;

pub const CSV_HEADER: &str = "ts,timeElapsed,cpuTimeElapsed,percentCPUSinceStart,percentCPUThisInterval,memoryUsageMiB,percentMemoryUsage";

/// Output line format, chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    #[value(alias = "structured")]
    #[serde(alias = "structured")]
    Json,
    /// Comma-separated rows after a single header line
    #[value(alias = "delimited")]
    #[serde(alias = "delimited")]
    Csv,
}

impl OutputFormat {
    /// Line written once before the first record, if the format has one.
    pub fn header(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Json => None,
            OutputFormat::Csv => Some(CSV_HEADER),
        }
    }

    /// Renders one sample as a single line, without the trailing newline.
    pub fn render(&self, sample: &DerivedSample) -> String {
        let ts = sample
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        match self {
            OutputFormat::Json => format!(
                r#"{{"ts":"{}","timeElapsed":{:.2},"cpuTimeElapsed":{:.2},"percentCPUSinceStart":{},"percentCPUThisInterval":{},"memoryUsageMiB":{:.2},"memoryUsagePercentage":{}}}"#,
                ts,
                sample.elapsed_since_start_secs,
                sample.cpu_secs_since_start,
                fixed_or(sample.cpu_percent_since_start, "null"),
                fixed_or(sample.cpu_percent_this_interval, "null"),
                sample.memory_usage_mib,
                fixed_or(sample.memory_percent, "null"),
            ),
            OutputFormat::Csv => format!(
                "{},{:.2},{:.2},{},{},{:.2},{}",
                ts,
                sample.elapsed_since_start_secs,
                sample.cpu_secs_since_start,
                fixed_or(sample.cpu_percent_since_start, ""),
                fixed_or(sample.cpu_percent_this_interval, ""),
                sample.memory_usage_mib,
                fixed_or(sample.memory_percent, ""),
            ),
        }
    }
}

fn fixed_or(value: Option<f64>, missing: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => missing.to_string(),
    }
}

/// A json output line read back into its named fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    pub ts: String,
    pub time_elapsed: f64,
    pub cpu_time_elapsed: f64,
    #[serde(rename = "percentCPUSinceStart")]
    pub percent_cpu_since_start: Option<f64>,
    #[serde(rename = "percentCPUThisInterval")]
    pub percent_cpu_this_interval: Option<f64>,
    #[serde(rename = "memoryUsageMiB")]
    pub memory_usage_mib: f64,
    pub memory_usage_percentage: Option<f64>,
}

/// Parses one json output line.
pub fn parse_structured(line: &str) -> serde_json::Result<SampleRecord> {
    serde_json::from_str(line.trim_end())
}
