//! Service readiness polling.
//!
//! Handles are re-resolved on every iteration because a container may not exist yet, or
//! may have been recreated since the last look.

mod classify;
mod discovery;
mod poller;

pub use classify::{aggregate, classify, Verdict};
pub use discovery::{DiscoveryError, QueryError, ServiceDiscovery, ServiceHandle, StatusQuery};
pub use poller::{HealthCheckError, HealthPoller, HealthReport, PollVerdict};
