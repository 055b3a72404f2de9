use std::collections::BTreeMap;

use stackup_core::{HealthStatus, ProbeHealth, ServiceHealth, ServiceState};

/// Classifies one service. `None` means no handle was found.
///
/// Rules apply in order: absent is starting; present but not running is unhealthy;
/// running and healthy is healthy; running without a probe is ready; a failing probe is
/// unhealthy; a probe still warming up is starting; anything else is unknown.
pub fn classify(service_id: &str, state: Option<&ServiceState>) -> ServiceHealth {
    let Some(state) = state else {
        return ServiceHealth::new(service_id, false, HealthStatus::Starting);
    };

    if !state.running {
        return ServiceHealth::new(service_id, false, HealthStatus::Unhealthy)
            .with_exit_code(state.exit_code)
            .with_error("process exited");
    }

    match &state.health {
        ProbeHealth::Healthy => ServiceHealth::new(service_id, true, HealthStatus::Healthy),
        ProbeHealth::NotConfigured => {
            ServiceHealth::new(service_id, true, HealthStatus::NoHealthcheck)
        }
        ProbeHealth::Unhealthy => ServiceHealth::new(service_id, true, HealthStatus::Unhealthy)
            .with_error("health probe failing"),
        ProbeHealth::Starting => ServiceHealth::new(service_id, true, HealthStatus::Starting),
        ProbeHealth::Other(raw) => ServiceHealth::new(service_id, true, HealthStatus::Unknown)
            .with_error(format!("unrecognised health state `{raw}`")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllHealthy,
    AnyUnhealthy,
    /// Nothing has failed, but something is still starting.
    Pending,
}

/// Decides one iteration from a complete snapshot.
pub fn aggregate(statuses: &BTreeMap<String, ServiceHealth>) -> Verdict {
    if statuses.values().any(|s| s.status.is_failure()) {
        return Verdict::AnyUnhealthy;
    }
    if statuses.values().all(ServiceHealth::is_ready) {
        return Verdict::AllHealthy;
    }
    Verdict::Pending
}
