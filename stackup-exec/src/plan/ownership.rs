use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raised by a forward action when this run created its artifact rather than finding one
/// from an earlier install. A failed install only undoes steps whose flag is raised.
#[derive(Debug, Clone, Default)]
pub struct Ownership(Arc<AtomicBool>);

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
