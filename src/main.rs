use anyhow::Result;
use containerlog::*;
use containerlog::docker_repo::DockerRepo;
use containerlog::output::SampleWriter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout may be the sample stream.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let probe_config = config::ProbeConfig::load()?;
    tracing::info!(
        version = %version::user_agent(),
        container = %probe_config.container,
        format = ?probe_config.output_format,
        interval_secs = probe_config.interval_secs,
        output = %probe_config.output,
        "Starting container sampler"
    );

    let docker_repo = DockerRepo::connect()?;
    match docker_repo.describe(&probe_config.container).await {
        Ok(info) => tracing::info!(id = %info.id, name = %info.name, "Monitoring container"),
        Err(e) if !e.is_retryable() => return Err(e.into()),
        Err(e) => tracing::warn!(error = %e, operation = "describe", "container lookup failed"),
    }

    let sink = probe_config.output.open().await?;
    let mut writer = SampleWriter::new(
        sink,
        probe_config.output_format,
        probe_config.output.to_string(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    let result = sampler::run(
        &docker_repo,
        &probe_config.container,
        &mut writer,
        probe_config.sampler_config(),
        shutdown_rx,
    )
    .await;
    let closed = writer.finish().await;

    let summary = result?;
    closed?;
    tracing::info!(samples_written = summary.samples_written, "Sampler stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
