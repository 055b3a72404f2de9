#![forbid(unsafe_code)]

//! Data model, configuration and validation shared by the stackup engine and CLI.

pub mod config;
pub mod error;
pub mod types;
pub mod validate;

pub use crate::config::{
    load_config, parse_config_str, AdminConfig, ApiConfig, ConfigFormat, ConfigOverrides,
    ProxyConfig, RetrySettings, RollbackSettings, SourceConfig, StackConfig, TimeoutSettings,
};
pub use crate::error::{ConfigError, PlanError, StackupError, ValidationError, Violation};
pub use crate::types::{
    HealthStatus, ProbeHealth, RollbackReport, ServiceHealth, ServiceState, StepFailure,
    WorkflowOutcome,
};
pub use crate::validate::{validate_config, validate_step_names, Validator};
