use std::path::Path;

use async_trait::async_trait;

use crate::tools::process::{ToolCommand, ToolError};

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Materialises `revision` of `repository` at `dest`, which must not exist yet.
    async fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<(), ToolError>;
}

/// Shallow single-branch clone through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<(), ToolError> {
        ToolCommand::new(&self.program)
            .args(["clone", "--quiet", "--depth", "1", "--branch", revision, repository])
            .path_arg(dest)
            .run()
            .await
            .map(drop)
    }
}
