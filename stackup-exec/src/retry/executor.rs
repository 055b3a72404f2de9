use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::debug;

use crate::retry::{ErrorClass, OperationError, RetryPolicy};
use crate::workflow::panic_message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    Succeeded { value: T, attempts: u32 },
    /// The operation failed terminally in a way that means its goal is already met.
    AlreadySatisfied { error: OperationError, attempts: u32 },
}

impl<T> Completion<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Completion::Succeeded { attempts, .. } | Completion::AlreadySatisfied { attempts, .. } => {
                *attempts
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: OperationError },
    #[error("terminal error on attempt {attempts}: {last}")]
    Terminal { attempts: u32, last: OperationError },
}

impl RetryError {
    pub fn last(&self) -> &OperationError {
        match self {
            RetryError::Exhausted { last, .. } | RetryError::Terminal { last, .. } => last,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Terminal { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Bounded exponential-backoff retry. Delays carry no jitter.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries every failure until the attempt budget is spent.
    pub async fn retry<T, F, Fut>(&self, op: F) -> Result<Completion<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        self.retry_classified(op, |_| ErrorClass::Retryable).await
    }

    pub async fn retry_classified<T, F, Fut, C>(
        &self,
        mut op: F,
        classify: C,
    ) -> Result<Completion<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
        C: Fn(&OperationError) -> ErrorClass,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match AssertUnwindSafe(async { op().await }).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(OperationError::new(format!(
                    "operation panicked: {}",
                    panic_message(&*payload)
                ))),
            };

            let err = match result {
                Ok(value) => {
                    return Ok(Completion::Succeeded {
                        value,
                        attempts: attempt,
                    })
                }
                Err(err) => err,
            };

            match classify(&err) {
                ErrorClass::AlreadySatisfied => {
                    debug!(attempt, error = %err, "operation already satisfied");
                    return Ok(Completion::AlreadySatisfied {
                        error: err,
                        attempts: attempt,
                    });
                }
                ErrorClass::Terminal => {
                    return Err(RetryError::Terminal {
                        attempts: attempt,
                        last: err,
                    })
                }
                ErrorClass::Retryable => {}
            }

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = backoff.next().unwrap_or(self.policy.max_delay);
            debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed; backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Same loop over a plain predicate. Returns the number of checks it took.
    pub async fn wait_for<F, Fut>(&self, mut condition: F) -> Result<u32, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.retry(|| {
            let check = condition();
            async move {
                if check.await {
                    Ok(())
                } else {
                    Err(OperationError::new("condition not met"))
                }
            }
        })
        .await
        .map(|c| c.attempts())
    }
}
