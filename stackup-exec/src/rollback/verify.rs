use std::path::PathBuf;
use std::sync::Arc;

use crate::health::ServiceDiscovery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Path(PathBuf),
    Service(String),
}

/// Something an install leaves behind and a rollback is expected to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub label: String,
    pub kind: ArtifactKind,
    /// Step whose compensation removes it.
    pub step: Option<String>,
}

impl Artifact {
    pub fn path(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            kind: ArtifactKind::Path(path.into()),
            step: None,
        }
    }

    pub fn service(service_id: impl Into<String>) -> Self {
        let id = service_id.into();
        Self {
            label: format!("service {id}"),
            kind: ArtifactKind::Service(id),
            step: None,
        }
    }

    pub fn removed_by(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// Read-only check for artifacts that survived a rollback. Findings are advisory.
#[derive(Clone)]
pub struct StateProbe {
    artifacts: Vec<Artifact>,
    discovery: Option<Arc<dyn ServiceDiscovery>>,
}

impl StateProbe {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self {
            artifacts,
            discovery: None,
        }
    }

    /// Service artifacts are only checked when a discovery backend is attached.
    pub fn with_discovery(mut self, discovery: Arc<dyn ServiceDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub async fn leftovers(&self) -> Vec<String> {
        self.leftovers_except(&[]).await
    }

    /// Like [`leftovers`](Self::leftovers), ignoring artifacts of steps that were not
    /// undone. Those are expected to still be there.
    pub async fn leftovers_except(&self, kept_steps: &[String]) -> Vec<String> {
        let mut found = Vec::new();
        let expected = self
            .artifacts
            .iter()
            .filter(|a| a.step.as_ref().map_or(true, |s| !kept_steps.contains(s)));
        for artifact in expected {
            match &artifact.kind {
                ArtifactKind::Path(path) => match tokio::fs::try_exists(path).await {
                    Ok(true) => found.push(format!("{} {} still exists", artifact.label, path.display())),
                    Ok(false) => {}
                    Err(e) => found.push(format!("could not check {} {}: {e}", artifact.label, path.display())),
                },
                ArtifactKind::Service(id) => {
                    let Some(discovery) = &self.discovery else {
                        continue;
                    };
                    match discovery.resolve(id).await {
                        Ok(Some(handle)) => found.push(format!(
                            "{} still has container {}",
                            artifact.label,
                            handle.short_id()
                        )),
                        Ok(None) => {}
                        Err(e) => found.push(format!("could not check {}: {e}", artifact.label)),
                    }
                }
            }
        }
        found
    }
}
