mod config;
mod decision;
mod executor;

pub use config::{Backoff, RetryPolicy};
pub use decision::{classify_registration, ErrorClass, OperationError};
pub use executor::{Completion, RetryError, RetryExecutor};
