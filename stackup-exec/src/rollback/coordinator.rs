use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use stackup_core::RollbackReport;
use tracing::{info, warn};
use uuid::Uuid;

use crate::retry::{OperationError, RetryExecutor, RetryPolicy};
use crate::rollback::verify::StateProbe;
use crate::workflow::{run_guarded, Event, EventSink, Guarded, Step, StepAction};

/// Step name to undo action. Built once when the plan is assembled.
#[derive(Clone, Default)]
pub struct Compensations {
    by_step: BTreeMap<String, Arc<dyn StepAction>>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: &[Step]) -> Self {
        let by_step = steps
            .iter()
            .filter_map(|s| s.compensation().map(|c| (s.name().to_string(), c.clone())))
            .collect();
        Self { by_step }
    }

    pub fn insert(&mut self, step: impl Into<String>, action: Arc<dyn StepAction>) {
        self.by_step.insert(step.into(), action);
    }

    pub fn get(&self, step: &str) -> Option<&Arc<dyn StepAction>> {
        self.by_step.get(step)
    }

    /// Drops every compensation whose step fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.by_step.retain(|step, _| keep(step));
    }

    pub fn len(&self) -> usize {
        self.by_step.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_step.is_empty()
    }
}

impl fmt::Debug for Compensations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_step.keys()).finish()
    }
}

/// Undoes completed steps in reverse order. A failing compensation is recorded and the
/// remaining ones still run.
pub struct RollbackCoordinator {
    run_id: Uuid,
    timeout: Duration,
    event_sink: Arc<dyn EventSink>,
    retry: Option<RetryPolicy>,
    probe: Option<StateProbe>,
}

impl RollbackCoordinator {
    pub fn new(run_id: Uuid, timeout: Duration, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id,
            timeout,
            event_sink,
            retry: None,
            probe: None,
        }
    }

    /// Retries each compensation under `policy`. A single-attempt policy leaves the
    /// default once-only behaviour in place.
    pub fn with_compensation_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = (policy.max_attempts > 1).then_some(policy);
        self
    }

    /// Enables the advisory leftover check after all compensations ran.
    pub fn with_probe(mut self, probe: StateProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub async fn rollback(&self, completed: &[String], compensations: &Compensations) -> RollbackReport {
        let mut report = RollbackReport::default();
        if completed.is_empty() {
            return report;
        }

        let run_id = self.run_id;
        info!(%run_id, steps = completed.len(), "rolling back");

        for step in completed.iter().rev() {
            let Some(action) = compensations.get(step) else {
                warn!(%run_id, %step, "no compensation for this step; skipping");
                report.record_skipped(step);
                self.event_sink
                    .emit(Event::CompensationSkipped {
                        run_id,
                        step: step.clone(),
                    })
                    .await;
                continue;
            };

            self.event_sink
                .emit(Event::CompensationStarted {
                    run_id,
                    step: step.clone(),
                })
                .await;

            let error = match self.compensate(action.as_ref()).await {
                Ok(()) => {
                    info!(%run_id, %step, "compensated");
                    report.record_compensated(step);
                    None
                }
                Err(message) => {
                    warn!(%run_id, %step, error = %message, "compensation failed; continuing");
                    report.record_failure(step, &message);
                    Some(message)
                }
            };

            self.event_sink
                .emit(Event::CompensationFinished {
                    run_id,
                    step: step.clone(),
                    succeeded: error.is_none(),
                    error,
                })
                .await;
        }

        if let Some(probe) = &self.probe {
            report.leftovers = probe.leftovers_except(&report.skipped).await;
            for item in &report.leftovers {
                warn!(%run_id, leftover = %item, "not cleaned up");
            }
            self.event_sink
                .emit(Event::VerificationFinished {
                    run_id,
                    leftovers: report.leftovers.len(),
                })
                .await;
        }

        report
    }

    async fn compensate(&self, action: &dyn StepAction) -> Result<(), String> {
        let timeout = self.timeout;
        let Some(policy) = &self.retry else {
            return guarded_once(action, timeout).await.map_err(|e| e.to_string());
        };

        RetryExecutor::new(policy.clone())
            .retry(|| guarded_once(action, timeout))
            .await
            .map(drop)
            .map_err(|e| e.last().to_string())
    }
}

async fn guarded_once(action: &dyn StepAction, timeout: Duration) -> Result<(), OperationError> {
    match run_guarded(action, timeout).await {
        Guarded::Completed => Ok(()),
        Guarded::Failed(err) => Err(OperationError::new(err.to_string())),
        Guarded::TimedOut(limit) => Err(OperationError::new(format!(
            "timed out after {} ms",
            limit.as_millis()
        ))),
    }
}
