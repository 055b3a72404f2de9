mod health;
mod outcome;

pub use health::{HealthStatus, ProbeHealth, ServiceHealth, ServiceState};
pub use outcome::{RollbackReport, StepFailure, WorkflowOutcome};
