use std::path::Path;

use async_trait::async_trait;

use crate::tools::process::{ToolCommand, ToolError};

#[async_trait]
pub trait KeyGenerator: Send + Sync {
    /// Writes a key pair to `path` and `path.pub`.
    async fn generate(&self, path: &Path, comment: &str) -> Result<(), ToolError>;
}

#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: String,
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self {
            program: "ssh-keygen".to_string(),
        }
    }
}

#[async_trait]
impl KeyGenerator for SshKeygen {
    async fn generate(&self, path: &Path, comment: &str) -> Result<(), ToolError> {
        ToolCommand::new(&self.program)
            .args(["-t", "ed25519", "-N", "", "-q", "-C", comment, "-f"])
            .path_arg(path)
            .run()
            .await
            .map(drop)
    }
}
