use std::sync::Arc;

use serde::Serialize;
use stackup_core::{PlanError, RollbackReport, StackConfig, WorkflowOutcome};
use tracing::{info, warn};
use uuid::Uuid;

use crate::plan::InstallPlan;
use crate::retry::RetryPolicy;
use crate::rollback::RollbackCoordinator;
use crate::workflow::{EventSink, StepWorkflow};

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub run_id: Uuid,
    pub outcome: WorkflowOutcome,
    /// `None` when the install succeeded or rollback is disabled.
    pub rollback: Option<RollbackReport>,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallReport {
    pub run_id: Uuid,
    pub rollback: RollbackReport,
}

/// Ties a plan to the workflow and the rollback coordinator for one invocation.
pub struct Installer {
    run_id: Uuid,
    config: Arc<StackConfig>,
    event_sink: Arc<dyn EventSink>,
}

impl Installer {
    pub fn new(config: Arc<StackConfig>, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            event_sink,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Runs the plan. On failure the completed prefix is rolled back unless rollback is
    /// disabled in the config. Artifacts an earlier install left in place are kept.
    pub async fn install(&self, plan: &InstallPlan) -> Result<InstallReport, PlanError> {
        let workflow = StepWorkflow::new(self.run_id, self.config.timeouts.step(), self.event_sink.clone());
        let outcome = workflow.run(plan.steps()).await?;

        let rollback = match (outcome.succeeded(), self.config.rollback.enabled) {
            (true, _) => {
                info!(run_id = %self.run_id, "install complete");
                None
            }
            (false, false) => {
                warn!(run_id = %self.run_id, "rollback disabled; leaving completed steps in place");
                None
            }
            (false, true) => Some(
                self.coordinator(plan)
                    .rollback(outcome.completed_steps(), &plan.rollback_compensations())
                    .await,
            ),
        };

        Ok(InstallReport {
            run_id: self.run_id,
            outcome,
            rollback,
        })
    }

    /// Compensates every step of the plan, newest first. Each compensation tolerates
    /// finding nothing to undo.
    pub async fn uninstall(&self, plan: &InstallPlan) -> UninstallReport {
        let rollback = self
            .coordinator(plan)
            .rollback(&plan.step_names(), plan.compensations())
            .await;
        UninstallReport {
            run_id: self.run_id,
            rollback,
        }
    }

    fn coordinator(&self, plan: &InstallPlan) -> RollbackCoordinator {
        let policy = RetryPolicy::from(&self.config.retry)
            .with_max_attempts(self.config.rollback.compensation_attempts);
        let coordinator = RollbackCoordinator::new(self.run_id, self.config.timeouts.step(), self.event_sink.clone())
            .with_compensation_retry(policy);
        match plan.probe() {
            Some(probe) => coordinator.with_probe(probe.clone()),
            None => coordinator,
        }
    }
}
