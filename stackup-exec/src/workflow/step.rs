use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::health::HealthCheckError;
use crate::http::HttpError;
use crate::retry::RetryError;
use crate::tools::ToolError;

pub type ActionResult = Result<(), ActionError>;

/// Error half of the uniform result contract shared by actions and compensations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Health(#[from] HealthCheckError),
    #[error(transparent)]
    Retry(#[from] RetryError),
    #[error("{context}: {message}")]
    Io { context: String, message: String },
    #[error("action panicked: {0}")]
    Panicked(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }

    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        ActionError::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// One side-effecting unit of work. Implementations must tolerate being re-invoked.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self) -> ActionResult;
}

/// Adapts an async closure into a [`StepAction`].
pub struct FnAction<F>(F);

impl<F> FnAction<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> StepAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send,
{
    async fn run(&self) -> ActionResult {
        (self.0)().await
    }
}

pub fn action_fn<F, Fut>(f: F) -> Arc<dyn StepAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(FnAction::new(f))
}

/// Stands in for a real action under `--dry-run`: logs and reports success.
pub struct DryRunAction {
    step: String,
    phase: &'static str,
}

impl DryRunAction {
    pub fn new(step: impl Into<String>, phase: &'static str) -> Self {
        Self {
            step: step.into(),
            phase,
        }
    }
}

#[async_trait]
impl StepAction for DryRunAction {
    async fn run(&self) -> ActionResult {
        tracing::info!(step = %self.step, phase = self.phase, "dry run: skipping side effects");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Step {
    name: String,
    action: Arc<dyn StepAction>,
    compensation: Option<Arc<dyn StepAction>>,
    timeout: Option<Duration>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::from_arc(name, Arc::new(action))
    }

    pub fn from_arc(name: impl Into<String>, action: Arc<dyn StepAction>) -> Self {
        Self {
            name: name.into(),
            action,
            compensation: None,
            timeout: None,
        }
    }

    pub fn with_compensation(mut self, compensation: impl StepAction + 'static) -> Self {
        self.compensation = Some(Arc::new(compensation));
        self
    }

    pub fn with_compensation_arc(mut self, compensation: Arc<dyn StepAction>) -> Self {
        self.compensation = Some(compensation);
        self
    }

    /// Overrides the workflow-wide step timeout for this step only.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the action and any compensation with logging no-ops.
    pub fn into_dry_run(self) -> Self {
        let compensation = self
            .compensation
            .as_ref()
            .map(|_| Arc::new(DryRunAction::new(self.name.clone(), "compensate")) as Arc<dyn StepAction>);
        Self {
            action: Arc::new(DryRunAction::new(self.name.clone(), "run")),
            compensation,
            name: self.name,
            timeout: self.timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Arc<dyn StepAction> {
        &self.action
    }

    pub fn compensation(&self) -> Option<&Arc<dyn StepAction>> {
        self.compensation.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("has_compensation", &self.compensation.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
