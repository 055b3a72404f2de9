use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use stackup_core::{ProbeHealth, ServiceState, StackConfig};

use crate::health::{DiscoveryError, QueryError, ServiceDiscovery, ServiceHandle, StatusQuery};
use crate::tools::process::{ToolCommand, ToolError};

#[async_trait]
pub trait ComposeRunner: Send + Sync {
    async fn up(&self) -> Result<(), ToolError>;
    /// Must succeed when nothing is running.
    async fn down(&self) -> Result<(), ToolError>;
}

/// `docker compose` scoped to one project, compose file and env file.
#[derive(Debug, Clone)]
pub struct DockerCompose {
    program: String,
    project: String,
    compose_file: PathBuf,
    env_file: PathBuf,
}

impl DockerCompose {
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            program: "docker".to_string(),
            project: config.project.clone(),
            compose_file: config.compose_file(),
            env_file: config.env_file(),
        }
    }

    pub(crate) async fn command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program)
            .args(["compose", "-p", self.project.as_str(), "-f"])
            .path_arg(&self.compose_file);
        // compose refuses to start when an explicit env file is missing
        if tokio::fs::try_exists(&self.env_file).await.unwrap_or(false) {
            cmd = cmd.arg("--env-file").path_arg(&self.env_file);
        }
        cmd
    }
}

#[async_trait]
impl ComposeRunner for DockerCompose {
    async fn up(&self) -> Result<(), ToolError> {
        self.command()
            .await
            .args(["up", "-d", "--remove-orphans"])
            .run()
            .await
            .map(drop)
    }

    async fn down(&self) -> Result<(), ToolError> {
        if !tokio::fs::try_exists(&self.compose_file).await.unwrap_or(false) {
            tracing::debug!(file = %self.compose_file.display(), "no compose file; nothing to stop");
            return Ok(());
        }
        self.command()
            .await
            .args(["down", "--volumes", "--remove-orphans"])
            .run()
            .await
            .map(drop)
    }
}

/// Looks containers up by compose labels, so it works without the compose file on disk.
#[derive(Debug, Clone)]
pub struct DockerServices {
    program: String,
    project: String,
}

impl DockerServices {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            program: "docker".to_string(),
            project: project.into(),
        }
    }
}

#[async_trait]
impl ServiceDiscovery for DockerServices {
    async fn resolve(&self, service_id: &str) -> Result<Option<ServiceHandle>, DiscoveryError> {
        let stdout = ToolCommand::new(&self.program)
            .args(["ps", "--all", "--quiet", "--filter"])
            .arg(format!("label=com.docker.compose.project={}", self.project))
            .arg("--filter")
            .arg(format!("label=com.docker.compose.service={service_id}"))
            .run()
            .await
            .map_err(|e| DiscoveryError(e.to_string()))?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|id| ServiceHandle::new(service_id, id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerState {
    running: bool,
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    health: Option<ContainerHealth>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerHealth {
    status: String,
}

pub(crate) fn parse_container_state(raw: &str) -> Result<ServiceState, serde_json::Error> {
    let state: ContainerState = serde_json::from_str(raw.trim())?;
    Ok(ServiceState {
        running: state.running,
        health: ProbeHealth::parse(state.health.as_ref().map(|h| h.status.as_str())),
        exit_code: if state.running { None } else { state.exit_code },
    })
}

#[async_trait]
impl StatusQuery for DockerServices {
    async fn query(&self, handle: &ServiceHandle) -> Result<ServiceState, QueryError> {
        let out = ToolCommand::new(&self.program)
            .args(["inspect", "--format", "{{json .State}}", handle.instance_id()])
            .output()
            .await
            .map_err(|e| QueryError::Failed(e.to_string()))?;

        if !out.success() {
            if out.stderr.contains("No such object") || out.stderr.contains("No such container") {
                return Err(QueryError::Vanished(handle.short_id().to_string()));
            }
            return Err(QueryError::Failed(out.stderr));
        }

        parse_container_state(&out.stdout)
            .map_err(|e| QueryError::Failed(format!("unreadable container state: {e}")))
    }
}
