use async_trait::async_trait;
use stackup_core::ServiceState;

/// Opaque reference to one running instance of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    service_id: String,
    instance_id: String,
}

impl ServiceHandle {
    pub fn new(service_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            instance_id: instance_id.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Abbreviated instance id for operator output.
    pub fn short_id(&self) -> &str {
        let end = self
            .instance_id
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.instance_id.len());
        &self.instance_id[..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("service discovery failed: {0}")]
pub struct DiscoveryError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The instance disappeared between discovery and the status query.
    #[error("instance {0} no longer exists")]
    Vanished(String),
    #[error("status query failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// `Ok(None)` means the service has not materialised yet.
    async fn resolve(&self, service_id: &str) -> Result<Option<ServiceHandle>, DiscoveryError>;
}

#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn query(&self, handle: &ServiceHandle) -> Result<ServiceState, QueryError>;
}
