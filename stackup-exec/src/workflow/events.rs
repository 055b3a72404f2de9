use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

/// Progress notifications. Purely informational: nothing in the engine reads them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        total: usize,
    },
    StepStarted {
        run_id: Uuid,
        step: String,
        index: usize,
        total: usize,
    },
    StepSucceeded {
        run_id: Uuid,
        step: String,
        index: usize,
        total: usize,
        elapsed_ms: u64,
    },
    StepFailed {
        run_id: Uuid,
        step: String,
        index: usize,
        total: usize,
        error: String,
        timed_out: bool,
    },
    RunFinished {
        run_id: Uuid,
        succeeded: bool,
        completed: usize,
    },
    CompensationStarted {
        run_id: Uuid,
        step: String,
    },
    CompensationSkipped {
        run_id: Uuid,
        step: String,
    },
    CompensationFinished {
        run_id: Uuid,
        step: String,
        succeeded: bool,
        error: Option<String>,
    },
    VerificationFinished {
        run_id: Uuid,
        leftovers: usize,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::StepStarted { .. } => "step.started",
            Event::StepSucceeded { .. } => "step.succeeded",
            Event::StepFailed { .. } => "step.failed",
            Event::RunFinished { .. } => "run.finished",
            Event::CompensationStarted { .. } => "compensation.started",
            Event::CompensationSkipped { .. } => "compensation.skipped",
            Event::CompensationFinished { .. } => "compensation.finished",
            Event::VerificationFinished { .. } => "verification.finished",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let kind = self.kind();
        match self {
            Event::RunStarted { run_id, total } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "total": total })
            }
            Event::StepStarted { run_id, step, index, total } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "step": step, "index": index, "total": total })
            }
            Event::StepSucceeded { run_id, step, index, total, elapsed_ms } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "step": step, "index": index, "total": total, "elapsed_ms": elapsed_ms })
            }
            Event::StepFailed { run_id, step, index, total, error, timed_out } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "step": step, "index": index, "total": total, "error": error, "timed_out": timed_out })
            }
            Event::RunFinished { run_id, succeeded, completed } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "succeeded": succeeded, "completed": completed })
            }
            Event::CompensationStarted { run_id, step } | Event::CompensationSkipped { run_id, step } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "step": step })
            }
            Event::CompensationFinished { run_id, step, succeeded, error } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "step": step, "succeeded": succeeded, "error": error })
            }
            Event::VerificationFinished { run_id, leftovers } => {
                json!({ "type": kind, "run_id": run_id.to_string(), "leftovers": leftovers })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

/// Human-readable progress on stderr.
pub struct TextEventSink;

#[async_trait]
impl EventSink for TextEventSink {
    async fn emit(&self, event: Event) {
        match event {
            Event::StepStarted { step, index, total, .. } => {
                eprintln!("[{index}/{total}] {step} ...");
            }
            Event::StepSucceeded { step, index, total, elapsed_ms, .. } => {
                eprintln!("[{index}/{total}] {step} done ({elapsed_ms}ms)");
            }
            Event::StepFailed { step, index, total, error, .. } => {
                eprintln!("[{index}/{total}] {step} FAILED: {error}");
            }
            Event::CompensationStarted { step, .. } => eprintln!("  undo {step} ..."),
            Event::CompensationSkipped { step, .. } => {
                eprintln!("  undo {step}: nothing registered, skipped");
            }
            Event::CompensationFinished { step, succeeded: false, error, .. } => {
                eprintln!("  undo {step} FAILED: {}", error.unwrap_or_default());
            }
            Event::RunStarted { .. }
            | Event::RunFinished { .. }
            | Event::CompensationFinished { .. }
            | Event::VerificationFinished { .. } => {}
        }
    }
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::StepFailed { .. } => tracing::warn!(event = %event.to_json(), "{}", event.kind()),
            Event::CompensationFinished { succeeded: false, .. } => {
                tracing::warn!(event = %event.to_json(), "{}", event.kind())
            }
            _ => tracing::debug!(event = %event.to_json(), "{}", event.kind()),
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
