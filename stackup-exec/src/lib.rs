#![forbid(unsafe_code)]

//! Installation engine: sequential steps, reverse-order rollback, readiness polling and
//! bounded retry, plus the concrete install plan and the tools it drives.

pub mod health;
pub mod http;
pub mod installer;
pub mod plan;
pub mod retry;
pub mod rollback;
pub mod tools;
pub mod workflow;

pub use crate::health::{HealthCheckError, HealthPoller, HealthReport, PollVerdict};
pub use crate::http::{HttpClient, HttpError, ReqwestHttpClient};
pub use crate::installer::{InstallReport, Installer, UninstallReport};
pub use crate::plan::InstallPlan;
pub use crate::retry::{Completion, RetryError, RetryExecutor, RetryPolicy};
pub use crate::rollback::{Compensations, RollbackCoordinator, StateProbe};
pub use crate::tools::{ToolError, Toolchain};
pub use crate::workflow::{
    ActionError, ActionResult, Event, EventSink, Step, StepAction, StepWorkflow,
};
