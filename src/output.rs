// Output destination: a single stream, written one flushed line at a time.

use crate::models::DerivedSample;
use crate::render::OutputFormat;
use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Where samples go. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// An empty path selects stdout.
    pub fn from_path(path: &str) -> Self {
        if path.is_empty() {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(path))
        }
    }

    /// Opens the destination. Existing files are truncated.
    pub async fn open(&self) -> anyhow::Result<Box<dyn AsyncWrite + Send + Unpin>> {
        match self {
            OutputTarget::Stdout => Ok(Box::new(tokio::io::stdout())),
            OutputTarget::File(path) => {
                let file = tokio::fs::File::create(path)
                    .await
                    .with_context(|| format!("cannot open output file {}", path.display()))?;
                Ok(Box::new(file))
            }
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Renders samples onto `W`, writing the format header before the first record.
pub struct SampleWriter<W> {
    inner: W,
    format: OutputFormat,
    destination: String,
    header_written: bool,
    records_written: u64,
}

impl<W: AsyncWrite + Unpin> SampleWriter<W> {
    pub fn new(inner: W, format: OutputFormat, destination: impl Into<String>) -> Self {
        Self {
            inner,
            format,
            destination: destination.into(),
            header_written: false,
            records_written: 0,
        }
    }

    /// Writes the header if it is still pending. Called by `write_sample`;
    /// exposed so the header lands before the first tick.
    pub async fn write_header(&mut self) -> anyhow::Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        if let Some(header) = self.format.header() {
            self.write_line(header).await?;
        }
        Ok(())
    }

    /// Appends one record and flushes it.
    pub async fn write_sample(&mut self, sample: &DerivedSample) -> anyhow::Result<()> {
        self.write_header().await?;
        let line = self.format.render(sample);
        self.write_line(&line).await?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes and shuts down the stream, returning it.
    pub async fn finish(mut self) -> anyhow::Result<W> {
        self.inner
            .shutdown()
            .await
            .with_context(|| format!("closing output {}", self.destination))?;
        Ok(self.inner)
    }

    async fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.inner
            .write_all(&buf)
            .await
            .with_context(|| format!("writing to output {}", self.destination))?;
        self.inner
            .flush()
            .await
            .with_context(|| format!("flushing output {}", self.destination))?;
        Ok(())
    }
}
