use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a workflow stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    #[error("step `{step}` failed: {message}")]
    Failed { step: String, message: String },
    /// The action outlived its step timeout. Its side effects may still be in flight.
    #[error("step `{step}` timed out after {timeout_ms}ms")]
    TimedOut { step: String, timeout_ms: u64 },
}

impl StepFailure {
    pub fn step(&self) -> &str {
        match self {
            StepFailure::Failed { step, .. } | StepFailure::TimedOut { step, .. } => step,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StepFailure::TimedOut { .. })
    }
}

/// Progress of one workflow run.
///
/// `completed_steps` only ever grows by appending, and never after a failure has been
/// recorded, so it is always a prefix of the planned step list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    completed_steps: Vec<String>,
    failure: Option<StepFailure>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Default for WorkflowOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowOutcome {
    pub fn new() -> Self {
        Self {
            completed_steps: Vec::new(),
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_completed(&mut self, step: impl Into<String>) {
        debug_assert!(self.failure.is_none(), "step completed after a recorded failure");
        if self.failure.is_none() {
            self.completed_steps.push(step.into());
        }
    }

    /// Only the first failure is kept.
    pub fn record_failure(&mut self, failure: StepFailure) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(StepFailure::step)
    }

    pub fn error(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// Result of undoing completed steps. Never an error: partial failure is data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    pub succeeded: bool,
    /// `"<step>: <error>"` for every compensation that did not complete.
    pub failures: Vec<String>,
    /// Steps whose compensation ran successfully, in the order they ran.
    pub compensated: Vec<String>,
    /// Completed steps that had no registered compensation.
    pub skipped: Vec<String>,
    /// Advisory: anything the verification pass found still present.
    pub leftovers: Vec<String>,
}

impl Default for RollbackReport {
    fn default() -> Self {
        Self {
            succeeded: true,
            failures: Vec::new(),
            compensated: Vec::new(),
            skipped: Vec::new(),
            leftovers: Vec::new(),
        }
    }
}

impl RollbackReport {
    pub fn record_compensated(&mut self, step: &str) {
        self.compensated.push(step.to_string());
    }

    pub fn record_skipped(&mut self, step: &str) {
        self.skipped.push(step.to_string());
    }

    pub fn record_failure(&mut self, step: &str, error: impl std::fmt::Display) {
        self.failures.push(format!("{step}: {error}"));
        self.succeeded = false;
    }

    pub fn is_clean(&self) -> bool {
        self.succeeded && self.leftovers.is_empty()
    }
}
