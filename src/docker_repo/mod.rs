// Docker container stats via bollard

mod stats;

use crate::error::FetchError;
use crate::models::RawSnapshot;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, StatsOptions};
use futures_util::StreamExt;
use std::future::Future;
use tracing::instrument;

/// Anything that can produce a raw stats reading for a container on demand.
pub trait StatsSource {
    fn fetch(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<RawSnapshot, FetchError>> + Send;
}

/// Container identity as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
}

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self { docker })
    }

    /// Resolves a name or ID to the container's full ID and name.
    #[instrument(skip(self), fields(repo = "docker", operation = "inspect_container"))]
    pub async fn describe(&self, container: &str) -> Result<ContainerInfo, FetchError> {
        let resp = self
            .docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(|e| FetchError::from_docker(container, e))?;
        let id = resp.id.unwrap_or_else(|| container.to_string());
        let name = resp
            .name
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| id.clone());
        Ok(ContainerInfo { id, name })
    }
}

impl StatsSource for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "stats"))]
    async fn fetch(&self, container: &str) -> Result<RawSnapshot, FetchError> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stream = self.docker.stats(container, Some(options));

        let response = match stream.next().await {
            Some(Ok(s)) => s,
            Some(Err(e)) => return Err(FetchError::from_docker(container, e)),
            None => {
                return Err(FetchError::StreamEnded {
                    container: container.to_string(),
                });
            }
        };
        let observed_at = chrono::Utc::now();

        stats::process_statistics(&response, observed_at).ok_or_else(|| FetchError::Malformed {
            container: container.to_string(),
            reason: "cpu_stats.cpu_usage.total_usage missing".into(),
        })
    }
}
