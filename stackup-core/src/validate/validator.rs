use std::sync::LazyLock;

use regex::Regex;

use crate::config::StackConfig;
use crate::error::{ValidationError, Violation};

use super::rules;

pub(crate) static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").expect("valid"));
pub(crate) static SERVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("valid"));

pub struct Validator {
    violations: Vec<Violation>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_config(&mut self, config: &StackConfig) {
        rules::validate_project(self, config);
        rules::validate_source(self, &config.source);
        rules::validate_services(self, &config.services);
        rules::validate_timeouts(self, &config.timeouts);
        rules::validate_retry(self, &config.retry);
        rules::validate_api(self, &config.api);
        rules::validate_proxy(self, &config.proxy);
        rules::validate_rollback(self, &config.rollback);
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    pub(crate) fn require_non_empty(&mut self, path: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(path, "must not be empty");
        }
    }
}
