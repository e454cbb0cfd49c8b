//! Docker implementation of `ContainerEngine` (via bollard).

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use epi_core::error::{EpiError, Result};
use futures::StreamExt;

use super::{ByteStream, ContainerEngine, ContainerSpec, LogChunk, OutputStream};

/// Container engine backed by a Docker daemon.
///
/// The connection is stateless per call and can be reused across jobs.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform default socket, and ping
    /// the daemon to make sure it is reachable.
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EpiError::RuntimeConnection(e.to_string()))?;
        docker
            .ping()
            .await
            .map_err(|e| EpiError::RuntimeConnection(e.to_string()))?;
        Ok(Self { docker })
    }

    /// The underlying client.
    pub fn client(&self) -> &Docker {
        &self.docker
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn pull_image(&self, image: &str) -> Result<ByteStream> {
        let (from_image, tag) = split_reference(image);
        let options = CreateImageOptions {
            from_image: from_image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        let stream = self
            .docker
            .create_image(Some(options), None, None)
            .map(|item| match item {
                Ok(info) => {
                    let mut line = serde_json::to_vec(&info)?;
                    line.push(b'\n');
                    Ok(line)
                }
                Err(e) => Err(EpiError::Execution(format!("image pull failed: {e}"))),
            });
        Ok(stream.boxed())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let mounts = spec
            .mounts
            .iter()
            .map(|m| Mount {
                source: Some(m.source.to_string_lossy().into_owned()),
                target: Some(m.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                ..Default::default()
            })
            .collect();

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            working_dir: (!spec.workdir.is_empty()).then(|| spec.workdir.clone()),
            env: Some(spec.env.clone()),
            tty: Some(false),
            host_config: Some(HostConfig {
                mounts: Some(mounts),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| EpiError::Execution(format!("create container: {e}")))?;

        for warning in &response.warnings {
            tracing::warn!(container = %response.id, warning = %warning, "Docker warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EpiError::Execution(format!("start container {id}: {e}")))
    }

    async fn logs(&self, id: &str) -> Result<OutputStream> {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let stream = self
            .docker
            .logs(id, Some(options))
            .filter_map(|item| async move {
                match item {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        Some(Ok(LogChunk::stdout(message.to_vec())))
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        Some(Ok(LogChunk::stderr(message.to_vec())))
                    }
                    Ok(LogOutput::StdIn { .. }) => None,
                    Err(e) => Some(Err(EpiError::Execution(format!("log stream: {e}")))),
                }
            });
        Ok(stream.boxed())
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        let mut wait = Box::pin(
            self.docker
                .wait_container(id, None::<WaitContainerOptions<String>>),
        );
        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(EpiError::Execution(format!("wait container {id}: {e}"))),
            None => Err(EpiError::Execution(format!(
                "wait container {id}: no status returned"
            ))),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| EpiError::Execution(format!("remove container {id}: {e}")))
    }
}

/// Split an image reference into repository and tag.
///
/// A reference without a tag or digest gets `latest`; without this Docker
/// would pull every tag of the repository.
fn split_reference(reference: &str) -> (&str, &str) {
    if reference.contains('@') {
        return (reference, "");
    }
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&reference[..split], &reference[split + 1..])
        }
        None => (reference, "latest"),
    }
}
