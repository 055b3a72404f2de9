//! Concrete actions and compensations for the install plan.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stackup_core::StackConfig;
use tracing::{debug, info, warn};
use url::Url;

use crate::health::{HealthPoller, ServiceDiscovery};
use crate::http::{HttpClient, HttpRequest};
use crate::plan::credentials::{write_private_file, Credentials};
use crate::plan::ownership::Ownership;
use crate::plan::proxy_conf::render_proxy_config;
use crate::retry::{OperationError, RetryExecutor, RetryPolicy};
use crate::tools::{ComposeRunner, KeyGenerator, ProxyLoader, SourceFetcher};
use crate::workflow::{ActionError, ActionResult, StepAction};

pub struct FetchSource {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub repository: String,
    pub revision: String,
    pub dest: PathBuf,
    pub owned: Ownership,
}

#[async_trait]
impl StepAction for FetchSource {
    async fn run(&self) -> ActionResult {
        if tokio::fs::try_exists(self.dest.join(".git")).await.unwrap_or(false) {
            info!(dest = %self.dest.display(), "source already present");
            return Ok(());
        }
        if let Some(parent) = self.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ActionError::io(format!("create {}", parent.display()), e))?;
        }
        self.fetcher
            .fetch(&self.repository, &self.revision, &self.dest)
            .await?;
        self.owned.claim();
        Ok(())
    }
}

/// Deletes files or directory trees. Paths that are already gone count as removed.
pub struct RemovePaths {
    pub paths: Vec<PathBuf>,
}

impl RemovePaths {
    pub fn one(path: PathBuf) -> Self {
        Self { paths: vec![path] }
    }
}

#[async_trait]
impl StepAction for RemovePaths {
    async fn run(&self) -> ActionResult {
        for path in &self.paths {
            let meta = match tokio::fs::symlink_metadata(path).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "already removed");
                    continue;
                }
                Err(e) => return Err(ActionError::io(format!("stat {}", path.display()), e)),
            };
            let removed = if meta.is_dir() {
                tokio::fs::remove_dir_all(path).await
            } else {
                tokio::fs::remove_file(path).await
            };
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ActionError::io(format!("remove {}", path.display()), e)),
            }
        }
        Ok(())
    }
}

/// Writes the env file unless one is already there. An existing file holds the secrets the
/// running stack was initialised with; `credentials` were loaded from it.
pub struct WriteCredentials {
    pub config: Arc<StackConfig>,
    pub credentials: Arc<Credentials>,
    pub owned: Ownership,
}

#[async_trait]
impl StepAction for WriteCredentials {
    async fn run(&self) -> ActionResult {
        let path = self.config.env_file();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            info!(path = %path.display(), "keeping existing credentials");
            return Ok(());
        }
        let contents = self.credentials.render_env(&self.config);
        write_private_file(&path, &contents)
            .await
            .map_err(|e| ActionError::io(format!("write {}", path.display()), e))?;
        self.owned.claim();
        Ok(())
    }
}

pub struct GenerateKeys {
    pub keys: Arc<dyn KeyGenerator>,
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub comment: String,
    pub owned: Ownership,
}

#[async_trait]
impl StepAction for GenerateKeys {
    async fn run(&self) -> ActionResult {
        let private = tokio::fs::try_exists(&self.private_key).await.unwrap_or(false);
        let public = tokio::fs::try_exists(&self.public_key).await.unwrap_or(false);
        if private && public {
            info!(key = %self.private_key.display(), "deploy key already present");
            return Ok(());
        }
        // a half-written pair would make the generator prompt for overwrite
        RemovePaths {
            paths: vec![self.private_key.clone(), self.public_key.clone()],
        }
        .run()
        .await?;

        if let Some(dir) = self.private_key.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ActionError::io(format!("create {}", dir.display()), e))?;
        }
        self.keys.generate(&self.private_key, &self.comment).await?;
        self.owned.claim();
        Ok(())
    }
}

/// Always rewrites the file, since it is derived from the config. Only claims it when no
/// earlier install had written one.
pub struct WriteProxyConfig {
    pub config: Arc<StackConfig>,
    pub owned: Ownership,
}

#[async_trait]
impl StepAction for WriteProxyConfig {
    async fn run(&self) -> ActionResult {
        let path = self.config.proxy_config_file();
        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ActionError::io(format!("create {}", dir.display()), e))?;
        }
        tokio::fs::write(&path, render_proxy_config(&self.config))
            .await
            .map_err(|e| ActionError::io(format!("write {}", path.display()), e))?;
        if !existed {
            self.owned.claim();
        }
        Ok(())
    }
}

/// Brings the stack up. The stack counts as this run's only when none of its services had
/// a container beforehand, so a failed re-run never tears down existing data volumes.
pub struct StartServices {
    pub compose: Arc<dyn ComposeRunner>,
    pub discovery: Arc<dyn ServiceDiscovery>,
    pub services: Vec<String>,
    pub owned: Ownership,
}

impl StartServices {
    async fn existing(&self) -> Result<Vec<&str>, ActionError> {
        let mut found = Vec::new();
        for id in &self.services {
            match self.discovery.resolve(id).await {
                Ok(Some(_)) => found.push(id.as_str()),
                Ok(None) => {}
                Err(e) => {
                    return Err(ActionError::failed(format!(
                        "checking for existing containers: {e}"
                    )))
                }
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl StepAction for StartServices {
    async fn run(&self) -> ActionResult {
        let existing = self.existing().await?;
        self.compose.up().await?;
        if existing.is_empty() {
            self.owned.claim();
        } else {
            warn!(services = ?existing, "stack already had containers; a failed install will leave it running");
        }
        Ok(())
    }
}

pub struct StopServices(pub Arc<dyn ComposeRunner>);

#[async_trait]
impl StepAction for StopServices {
    async fn run(&self) -> ActionResult {
        Ok(self.0.down().await?)
    }
}

pub struct VerifyServices {
    pub poller: HealthPoller,
    pub services: Vec<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[async_trait]
impl StepAction for VerifyServices {
    async fn run(&self) -> ActionResult {
        self.poller
            .wait(&self.services, self.timeout, self.poll_interval)
            .await
            .into_result()?;
        Ok(())
    }
}

pub struct ReloadProxy(pub Arc<dyn ProxyLoader>);

#[async_trait]
impl StepAction for ReloadProxy {
    async fn run(&self) -> ActionResult {
        Ok(self.0.reload().await?)
    }
}

/// Polls the API health endpoint until it answers 2xx.
pub struct WaitForApi {
    pub http: Arc<dyn HttpClient>,
    pub url: Url,
    pub request_timeout: Duration,
    pub policy: RetryPolicy,
}

impl WaitForApi {
    async fn probe(&self) -> Result<(), OperationError> {
        let resp = self
            .http
            .send(HttpRequest::get(self.url.clone()), self.request_timeout)
            .await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(OperationError::with_status(resp.status, resp.text()))
        }
    }
}

#[async_trait]
impl StepAction for WaitForApi {
    async fn run(&self) -> ActionResult {
        let done = RetryExecutor::new(self.policy.clone())
            .retry(|| self.probe())
            .await?;
        info!(url = %self.url, attempts = done.attempts(), "api is answering");
        Ok(())
    }
}
