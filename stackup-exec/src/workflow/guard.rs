use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;

use crate::workflow::{ActionError, StepAction};

pub(crate) enum Guarded {
    Completed,
    Failed(ActionError),
    /// The future was dropped at the deadline; whatever it started may still be running.
    TimedOut(Duration),
}

/// Runs an action under a deadline, turning panics into `ActionError::Panicked`.
pub(crate) async fn run_guarded(action: &dyn StepAction, timeout: Duration) -> Guarded {
    let fut = AssertUnwindSafe(async { action.run().await }).catch_unwind();
    match tokio::time::timeout(timeout, fut).await {
        Err(_) => Guarded::TimedOut(timeout),
        Ok(Err(payload)) => Guarded::Failed(ActionError::Panicked(panic_message(&*payload))),
        Ok(Ok(Err(e))) => Guarded::Failed(e),
        Ok(Ok(Ok(()))) => Guarded::Completed,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
