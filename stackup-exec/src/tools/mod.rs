//! External collaborators, one narrow trait each, plus the process-backed implementations.

mod compose;
mod git;
mod keygen;
mod process;
mod proxy;

use std::sync::Arc;

use stackup_core::StackConfig;

pub use compose::{ComposeRunner, DockerCompose, DockerServices};
pub use git::{GitFetcher, SourceFetcher};
pub use keygen::{KeyGenerator, SshKeygen};
pub use process::{probe_program, ToolCommand, ToolError, ToolOutput};
pub use proxy::{NginxReload, ProxyLoader};

use crate::health::{HealthPoller, ServiceDiscovery, StatusQuery};
use crate::http::{HttpClient, HttpError, ReqwestHttpClient};

/// Every collaborator an install or uninstall needs. Tests swap in mocks field by field.
#[derive(Clone)]
pub struct Toolchain {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub keys: Arc<dyn KeyGenerator>,
    pub compose: Arc<dyn ComposeRunner>,
    pub proxy: Arc<dyn ProxyLoader>,
    pub discovery: Arc<dyn ServiceDiscovery>,
    pub status: Arc<dyn StatusQuery>,
    pub http: Arc<dyn HttpClient>,
}

impl Toolchain {
    /// Binaries on `PATH` plus a real HTTP client.
    pub fn system(config: &StackConfig) -> Result<Self, HttpError> {
        let compose = DockerCompose::from_config(config);
        let services = Arc::new(DockerServices::new(config.project.clone()));
        Ok(Self {
            fetcher: Arc::new(GitFetcher::default()),
            keys: Arc::new(SshKeygen::default()),
            proxy: Arc::new(NginxReload::new(compose.clone(), config.proxy.service.clone())),
            compose: Arc::new(compose),
            discovery: services.clone(),
            status: services,
            http: Arc::new(ReqwestHttpClient::new()?),
        })
    }

    pub fn poller(&self) -> HealthPoller {
        HealthPoller::new(self.discovery.clone(), self.status.clone())
    }
}

/// Binaries the system toolchain shells out to.
pub const REQUIRED_PROGRAMS: &[&str] = &["git", "ssh-keygen", "docker"];
