//! Container control capability and a docker CLI backed implementation.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to launch {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Operations the executor may perform on a container.
///
/// Implementations own their timeouts and retries.
#[async_trait]
pub trait ContainerControl: Send + Sync {
    async fn restart(&self, id: &str) -> Result<(), ContainerError>;
    async fn stop(&self, id: &str) -> Result<(), ContainerError>;
    async fn start(&self, id: &str) -> Result<(), ContainerError>;
}

/// Drives containers through the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Return a client only if `<bin> version` succeeds.
    pub async fn detect(bin: &str) -> Option<Self> {
        match Command::new(bin).arg("version").output().await {
            Ok(output) if output.status.success() => {
                info!(%bin, "Container control available");
                Some(Self::new(bin))
            }
            Ok(output) => {
                warn!(%bin, status = %output.status, "Container runtime not reachable, container actions will be simulated");
                None
            }
            Err(e) => {
                warn!(%bin, error = %e, "Container CLI not found, container actions will be simulated");
                None
            }
        }
    }

    async fn run(&self, verb: &str, id: &str) -> Result<(), ContainerError> {
        debug!(bin = %self.bin, %verb, container = %id, "Running container command");
        let output = Command::new(&self.bin)
            .arg(verb)
            .arg(id)
            .output()
            .await
            .map_err(|source| ContainerError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ContainerError::CommandFailed {
                command: format!("{} {} {}", self.bin, verb, id),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerControl for DockerCli {
    async fn restart(&self, id: &str) -> Result<(), ContainerError> {
        self.run("restart", id).await
    }

    async fn stop(&self, id: &str) -> Result<(), ContainerError> {
        self.run("stop", id).await
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.run("start", id).await
    }
}
