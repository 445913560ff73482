// src/docker.rs

//! Docker Engine glue: image inspection, one-shot container runs and
//! build streaming
//!
//! Everything here is a thin wrapper over the daemon API. Failures are
//! terminal for the invocation; there are no retries and no timeout layer.

use crate::error::{Error, Result};
use bollard::body_full;
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::{
    BuildImageOptionsBuilder, CreateContainerOptionsBuilder, LogsOptionsBuilder,
    RemoveContainerOptionsBuilder, StartContainerOptions, WaitContainerOptions,
};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Read-only snapshot of an image's launch configuration, fetched once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageConfig {
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
    pub working_dir: String,
    /// `KEY=VALUE` entries in original order
    pub env: Vec<String>,
    pub user: String,
}

/// Tag of the graminized, signed image for `name`
pub fn gsc_image_name(name: &str) -> String {
    format!("gsc-{name}")
}

/// Tag of the graminized image before enclave signing
pub fn gsc_unsigned_image_name(name: &str) -> String {
    format!("gsc-{name}-unsigned")
}

/// Per-invocation build-context directory for `name`
pub fn gsc_build_path(name: &str) -> PathBuf {
    PathBuf::from("build").join(format!("gsc-{name}"))
}

/// Connection to the local Docker daemon
pub struct DockerService {
    docker: Docker,
}

impl DockerService {
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Fetch an image's launch configuration.
    ///
    /// A missing image maps to [`Error::ImageNotFound`]; any other daemon
    /// error propagates unchanged.
    pub async fn image_config(&self, image: &str) -> Result<ImageConfig> {
        let inspect = match self.docker.inspect_image(image).await {
            Ok(inspect) => inspect,
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => return Err(Error::ImageNotFound(image.to_string())),
            Err(err) => return Err(err.into()),
        };

        let config = inspect.config.unwrap_or_default();
        Ok(ImageConfig {
            entrypoint: config.entrypoint.unwrap_or_default(),
            cmd: config.cmd.unwrap_or_default(),
            working_dir: config.working_dir.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            user: config.user.unwrap_or_default(),
        })
    }

    /// Run `image` once with an overridden entrypoint and return its
    /// stdout. The container is removed afterwards regardless of outcome.
    pub async fn run_with_entrypoint(&self, image: &str, entrypoint: &[&str]) -> Result<String> {
        let name = format!("gsc-probe-{}", Uuid::new_v4().simple());
        debug!("Running {image} with entrypoint {entrypoint:?} as {name}");

        let options = CreateContainerOptionsBuilder::default().name(&name).build();
        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            entrypoint: Some(entrypoint.iter().map(|s| s.to_string()).collect()),
            // Clear the image command so only the probe entrypoint runs
            cmd: Some(Vec::new()),
            ..Default::default()
        };
        self.docker.create_container(Some(options), body).await?;

        let outcome = self.run_to_completion(&name).await;

        let remove = RemoveContainerOptionsBuilder::default().force(true).build();
        let _ = self.docker.remove_container(&name, Some(remove)).await;

        outcome
    }

    async fn run_to_completion(&self, name: &str) -> Result<String> {
        self.docker
            .start_container(name, None::<StartContainerOptions>)
            .await?;

        let mut wait = self
            .docker
            .wait_container(name, None::<WaitContainerOptions>);
        while let Some(status) = wait.next().await {
            status?;
        }

        let logs_options = LogsOptionsBuilder::default().stdout(true).build();
        let mut logs = self.docker.logs(name, Some(logs_options));
        let mut output = String::new();
        while let Some(chunk) = logs.next().await {
            output.push_str(&String::from_utf8_lossy(&chunk?.into_bytes()));
        }
        Ok(output)
    }

    /// Build an image from a staged context directory, streaming the
    /// daemon's log lines to the console as they arrive.
    pub async fn build_image(
        &self,
        context: &Path,
        tag: &str,
        dockerfile: &str,
        build_args: &HashMap<String, String>,
        no_cache: bool,
        rm: bool,
    ) -> Result<()> {
        info!("Building {tag} from {}", context.display());

        let mut archive = tar::Builder::new(Vec::new());
        archive.append_dir_all(".", context)?;
        let contents = archive.into_inner()?;

        let options = BuildImageOptionsBuilder::default()
            .dockerfile(dockerfile)
            .t(tag)
            .nocache(no_cache)
            .rm(rm)
            .buildargs(build_args)
            .build();

        let mut stream = self
            .docker
            .build_image(options, None, Some(body_full(contents.into())));
        while let Some(chunk) = stream.next().await {
            let update = chunk?;
            if let Some(text) = update.stream {
                for line in text.lines() {
                    println!("{line}");
                }
            }
            if let Some(detail) = update.error_detail {
                let message = detail
                    .message
                    .unwrap_or_else(|| "unknown build error".to_string());
                return Err(Error::BuildFailed(message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gsc_image_name() {
        assert_eq!(gsc_image_name("ubuntu:22.04"), "gsc-ubuntu:22.04");
    }

    #[test]
    fn test_gsc_unsigned_image_name() {
        assert_eq!(
            gsc_unsigned_image_name("ubuntu:22.04"),
            "gsc-ubuntu:22.04-unsigned"
        );
    }

    #[test]
    fn test_gsc_build_path() {
        assert_eq!(gsc_build_path("myapp"), PathBuf::from("build/gsc-myapp"));
    }
}
