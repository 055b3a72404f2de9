use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    /// Running with no probe configured; counts as ready.
    NoHealthcheck,
    /// Unrecognised state; counts as a failure.
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Starting => "starting",
            HealthStatus::NoHealthcheck => "no_healthcheck",
            HealthStatus::Unknown => "unknown",
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::NoHealthcheck)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, HealthStatus::Unhealthy | HealthStatus::Unknown)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health as reported by the container runtime's own probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeHealth {
    Healthy,
    Unhealthy,
    Starting,
    NotConfigured,
    Other(String),
}

impl ProbeHealth {
    /// Parses a runtime health string. `None` means no probe is configured.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("none") => ProbeHealth::NotConfigured,
            Some("healthy") => ProbeHealth::Healthy,
            Some("unhealthy") => ProbeHealth::Unhealthy,
            Some("starting") => ProbeHealth::Starting,
            Some(other) => ProbeHealth::Other(other.to_string()),
        }
    }
}

/// Raw state of one resolved service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceState {
    pub running: bool,
    pub health: ProbeHealth,
    pub exit_code: Option<i32>,
}

/// Classified health of one service, produced fresh on every poll iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub service_id: String,
    pub running: bool,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn new(service_id: impl Into<String>, running: bool, status: HealthStatus) -> Self {
        Self {
            service_id: service_id.into(),
            running,
            status,
            exit_code: None,
            error: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Ready means the aggregate can count this service as usable.
    pub fn is_ready(&self) -> bool {
        self.running && self.status.is_ready()
    }
}

impl std::fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.service_id, self.status)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit code {code})")?;
        }
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}
