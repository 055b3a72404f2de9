use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use stackup_core::{HealthStatus, ServiceHealth};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::health::classify::{aggregate, classify, Verdict};
use crate::health::discovery::{QueryError, ServiceDiscovery, StatusQuery};
use crate::workflow::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    AllHealthy,
    AnyUnhealthy,
    TimedOut,
}

/// Result of one `wait` call: the terminal verdict plus the last observed snapshot.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub verdict: PollVerdict,
    pub statuses: BTreeMap<String, ServiceHealth>,
    pub iterations: u32,
    pub elapsed: Duration,
    pub timeout: Duration,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.verdict == PollVerdict::AllHealthy
    }

    pub fn into_result(self) -> Result<BTreeMap<String, ServiceHealth>, HealthCheckError> {
        match self.verdict {
            PollVerdict::AllHealthy => Ok(self.statuses),
            PollVerdict::AnyUnhealthy => Err(HealthCheckError::Unhealthy {
                statuses: self.statuses,
            }),
            PollVerdict::TimedOut => Err(HealthCheckError::TimedOut {
                timeout_ms: self.timeout.as_millis() as u64,
                statuses: self.statuses,
            }),
        }
    }
}

/// Both variants carry the full per-service map so the operator can see which service failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HealthCheckError {
    #[error("services not ready after {timeout_ms} ms: {}", summarize(.statuses))]
    TimedOut {
        timeout_ms: u64,
        statuses: BTreeMap<String, ServiceHealth>,
    },
    #[error("unhealthy services: {}", summarize(.statuses))]
    Unhealthy {
        statuses: BTreeMap<String, ServiceHealth>,
    },
}

impl HealthCheckError {
    pub fn statuses(&self) -> &BTreeMap<String, ServiceHealth> {
        match self {
            HealthCheckError::TimedOut { statuses, .. } | HealthCheckError::Unhealthy { statuses } => {
                statuses
            }
        }
    }
}

fn summarize(statuses: &BTreeMap<String, ServiceHealth>) -> String {
    statuses
        .values()
        .filter(|s| !s.is_ready())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Polls a set of services until all are ready, one fails, or the budget runs out.
#[derive(Clone)]
pub struct HealthPoller {
    discovery: Arc<dyn ServiceDiscovery>,
    status: Arc<dyn StatusQuery>,
}

impl HealthPoller {
    pub fn new(discovery: Arc<dyn ServiceDiscovery>, status: Arc<dyn StatusQuery>) -> Self {
        Self { discovery, status }
    }

    pub async fn wait(
        &self,
        service_ids: &[String],
        timeout: Duration,
        poll_interval: Duration,
    ) -> HealthReport {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut iterations = 0u32;

        loop {
            iterations += 1;
            let statuses = self.snapshot(service_ids).await;
            let verdict = aggregate(&statuses);
            debug!(iteration = iterations, ?verdict, "health poll");

            let terminal = match verdict {
                Verdict::AllHealthy => Some(PollVerdict::AllHealthy),
                Verdict::AnyUnhealthy => Some(PollVerdict::AnyUnhealthy),
                Verdict::Pending if Instant::now() >= deadline => Some(PollVerdict::TimedOut),
                Verdict::Pending => None,
            };

            if let Some(verdict) = terminal {
                let elapsed = started.elapsed();
                match verdict {
                    PollVerdict::AllHealthy => {
                        info!(iterations, elapsed_ms = elapsed.as_millis() as u64, "all services ready")
                    }
                    _ => warn!(iterations, ?verdict, "services not ready"),
                }
                return HealthReport {
                    verdict,
                    statuses,
                    iterations,
                    elapsed,
                    timeout,
                };
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }

    /// One iteration: every service is resolved afresh and queried concurrently, and the
    /// map is returned only once all of them have answered.
    pub async fn snapshot(&self, service_ids: &[String]) -> BTreeMap<String, ServiceHealth> {
        let probes = service_ids.iter().map(|id| async move {
            let health = match AssertUnwindSafe(self.probe(id)).catch_unwind().await {
                Ok(health) => health,
                Err(payload) => ServiceHealth::new(id.as_str(), false, HealthStatus::Unknown)
                    .with_error(format!("probe panicked: {}", panic_message(&*payload))),
            };
            (id.clone(), health)
        });
        join_all(probes).await.into_iter().collect()
    }

    async fn probe(&self, service_id: &str) -> ServiceHealth {
        let handle = match self.discovery.resolve(service_id).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return classify(service_id, None),
            Err(err) => {
                return ServiceHealth::new(service_id, false, HealthStatus::Unknown)
                    .with_error(err.to_string())
            }
        };

        match self.status.query(&handle).await {
            Ok(state) => classify(service_id, Some(&state)),
            Err(QueryError::Vanished(id)) => {
                debug!(service = service_id, instance = %id, "instance vanished; treating as starting");
                classify(service_id, None)
            }
            Err(err @ QueryError::Failed(_)) => {
                ServiceHealth::new(service_id, false, HealthStatus::Unknown).with_error(err.to_string())
            }
        }
    }
}
