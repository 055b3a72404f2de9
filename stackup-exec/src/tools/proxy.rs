use async_trait::async_trait;

use crate::tools::compose::DockerCompose;
use crate::tools::process::ToolError;

#[async_trait]
pub trait ProxyLoader: Send + Sync {
    /// Makes the running proxy pick up its configuration file.
    async fn reload(&self) -> Result<(), ToolError>;
}

/// Sends `nginx -s reload` inside the proxy service container.
#[derive(Debug, Clone)]
pub struct NginxReload {
    compose: DockerCompose,
    service: String,
}

impl NginxReload {
    pub fn new(compose: DockerCompose, service: impl Into<String>) -> Self {
        Self {
            compose,
            service: service.into(),
        }
    }
}

#[async_trait]
impl ProxyLoader for NginxReload {
    async fn reload(&self) -> Result<(), ToolError> {
        self.compose
            .command()
            .await
            .args(["exec", "-T", self.service.as_str(), "nginx", "-s", "reload"])
            .run()
            .await
            .map(drop)
    }
}
