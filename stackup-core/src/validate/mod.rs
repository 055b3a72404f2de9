mod rules;
mod validator;

pub use validator::Validator;

use std::collections::BTreeSet;

use crate::config::StackConfig;
use crate::error::{PlanError, ValidationError};

pub fn validate_config(config: &StackConfig) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_config(config);
    v.finish()
}

/// Step names must be unique and the plan non-empty. Checked before anything executes.
pub fn validate_step_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<(), PlanError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(PlanError::DuplicateStep(name.to_string()));
        }
    }
    if seen.is_empty() {
        return Err(PlanError::Empty);
    }
    Ok(())
}
