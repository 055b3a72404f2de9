use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Failure of an external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },
    #[error("`{command}` exited with code {code}: {stderr}")]
    Exit {
        command: String,
        code: i32,
        stderr: String,
    },
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Builder for one external command. The child is killed if the future is dropped, so a
/// step timeout does not leave the tool running unattended.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs to completion and returns the output whatever the exit code.
    pub async fn output(&self) -> Result<ToolOutput, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %self.display(), "spawning tool");
        let out = cmd.output().await.map_err(|e| ToolError::Spawn {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        Ok(ToolOutput {
            code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        })
    }

    /// Runs to completion; a non-zero exit is an error. Returns stdout.
    pub async fn run(&self) -> Result<String, ToolError> {
        let out = self.output().await?;
        if out.success() {
            Ok(out.stdout)
        } else {
            Err(ToolError::Exit {
                command: self.display(),
                code: out.code,
                stderr: out.stderr,
            })
        }
    }
}

/// Whether `program` can be started at all. Only a spawn failure counts against it, since
/// not every tool understands `--version`.
pub async fn probe_program(program: &str) -> Result<String, ToolError> {
    let out = ToolCommand::new(program).arg("--version").output().await?;
    if !out.success() {
        return Ok("available".to_string());
    }
    Ok(out.stdout.lines().next().unwrap_or_default().trim().to_string())
}
