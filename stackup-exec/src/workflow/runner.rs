use std::sync::Arc;
use std::time::Duration;

use stackup_core::{validate_step_names, PlanError, StepFailure, WorkflowOutcome};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::workflow::events::{Event, EventSink};
use crate::workflow::{run_guarded, Guarded, Step};

/// Runs steps strictly in order and stops at the first failure.
pub struct StepWorkflow {
    run_id: Uuid,
    step_timeout: Duration,
    event_sink: Arc<dyn EventSink>,
}

impl StepWorkflow {
    pub fn new(run_id: Uuid, step_timeout: Duration, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id,
            step_timeout,
            event_sink,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Executes `steps`. Only a malformed plan is an `Err`; every runtime failure is
    /// reported through the returned outcome.
    pub async fn run(&self, steps: &[Step]) -> Result<WorkflowOutcome, PlanError> {
        validate_step_names(steps.iter().map(Step::name))?;

        let run_id = self.run_id;
        let total = steps.len();
        let mut outcome = WorkflowOutcome::new();
        self.event_sink.emit(Event::RunStarted { run_id, total }).await;

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let name = step.name().to_string();
            let timeout = step.timeout().unwrap_or(self.step_timeout);

            info!(%run_id, step = %name, index, total, "running step");
            self.event_sink
                .emit(Event::StepStarted {
                    run_id,
                    step: name.clone(),
                    index,
                    total,
                })
                .await;

            let started = Instant::now();
            let failure = match run_guarded(step.action().as_ref(), timeout).await {
                Guarded::Completed => None,
                Guarded::Failed(err) => Some(StepFailure::Failed {
                    step: name.clone(),
                    message: err.to_string(),
                }),
                Guarded::TimedOut(limit) => Some(StepFailure::TimedOut {
                    step: name.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            };

            match failure {
                None => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    outcome.record_completed(name.clone());
                    self.event_sink
                        .emit(Event::StepSucceeded {
                            run_id,
                            step: name,
                            index,
                            total,
                            elapsed_ms,
                        })
                        .await;
                }
                Some(failure) => {
                    warn!(%run_id, step = %name, error = %failure, "step failed; stopping");
                    self.event_sink
                        .emit(Event::StepFailed {
                            run_id,
                            step: name,
                            index,
                            total,
                            error: failure.to_string(),
                            timed_out: failure.is_timeout(),
                        })
                        .await;
                    outcome.record_failure(failure);
                    break;
                }
            }
        }

        outcome.finish();
        self.event_sink
            .emit(Event::RunFinished {
                run_id,
                succeeded: outcome.succeeded(),
                completed: outcome.completed_steps().len(),
            })
            .await;
        Ok(outcome)
    }
}
