use std::sync::LazyLock;

use regex::Regex;

use crate::http::HttpError;

/// Failure of a retryable network operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub message: String,
    /// HTTP status, or `None` when the request never got a response.
    pub status: Option<u16>,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for OperationError {}

impl From<HttpError> for OperationError {
    fn from(err: HttpError) -> Self {
        OperationError::new(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Terminal,
    /// Terminal, but it means the work is already done (idempotent completion).
    AlreadySatisfied,
}

static ALREADY_EXISTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\balready\s+(exists?|registered)\b").expect("valid"));

/// Retry policy for the admin registration call.
///
/// No status (network failure), 429 and 5xx are retried. Anything else is terminal, and a
/// terminal "already exists" / "already registered" answer counts as done.
pub fn classify_registration(err: &OperationError) -> ErrorClass {
    let class = match err.status {
        None => ErrorClass::Retryable,
        Some(429) => ErrorClass::Retryable,
        Some(s) if (500..=599).contains(&s) => ErrorClass::Retryable,
        Some(_) => ErrorClass::Terminal,
    };
    if class == ErrorClass::Terminal && ALREADY_EXISTS_RE.is_match(&err.message) {
        ErrorClass::AlreadySatisfied
    } else {
        class
    }
}
