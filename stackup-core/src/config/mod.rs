//! Explicit install configuration. One value is built per invocation and handed to every
//! step at construction time.

mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use loader::{load_config, parse_config_str, ConfigFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Compose project name; also prefixes generated artifacts.
    pub project: String,
    pub install_dir: PathBuf,
    /// Where generated credentials are written. Defaults to `<install_dir>/.env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,
    pub source: SourceConfig,
    /// Service ids that must become ready after `start_services`.
    pub services: Vec<String>,
    pub timeouts: TimeoutSettings,
    pub retry: RetrySettings,
    pub api: ApiConfig,
    pub admin: AdminConfig,
    pub proxy: ProxyConfig,
    pub rollback: RollbackSettings,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            project: "stackup".to_string(),
            install_dir: PathBuf::from("/opt/stackup"),
            env_file: None,
            source: SourceConfig::default(),
            services: ["db", "cache", "api", "frontend", "proxy"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeouts: TimeoutSettings::default(),
            retry: RetrySettings::default(),
            api: ApiConfig::default(),
            admin: AdminConfig::default(),
            proxy: ProxyConfig::default(),
            rollback: RollbackSettings::default(),
        }
    }
}

impl StackConfig {
    pub fn source_dir(&self) -> PathBuf {
        self.install_dir.join("source")
    }

    pub fn compose_file(&self) -> PathBuf {
        self.source_dir().join(&self.source.compose_file)
    }

    pub fn env_file(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| self.install_dir.join(".env"))
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.install_dir.join("keys")
    }

    pub fn deploy_key(&self) -> PathBuf {
        self.keys_dir().join("deploy_key")
    }

    pub fn deploy_key_pub(&self) -> PathBuf {
        self.keys_dir().join("deploy_key.pub")
    }

    pub fn proxy_config_file(&self) -> PathBuf {
        self.install_dir.join("proxy").join(format!("{}.conf", self.project))
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.install_dir {
            self.install_dir = dir.clone();
        }
        if let Some(env_file) = &overrides.env_file {
            self.env_file = Some(env_file.clone());
        }
        if let Some(secs) = overrides.step_timeout_seconds {
            self.timeouts.step_seconds = secs;
        }
        if overrides.disable_rollback {
            self.rollback.enabled = false;
        }
    }
}

/// Values supplied on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub install_dir: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub step_timeout_seconds: Option<u64>,
    pub disable_rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub repository: String,
    pub revision: String,
    /// Compose file path, relative to the fetched source tree.
    pub compose_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: "https://github.com/stackup-dev/stack.git".to_string(),
            revision: "main".to_string(),
            compose_file: PathBuf::from("docker-compose.yml"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Wall-clock budget for each step.
    pub step_seconds: u64,
    /// Budget for the service readiness wait. Must fit inside `step_seconds`.
    pub health_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            step_seconds: 300,
            health_seconds: 180,
            poll_interval_ms: 2000,
        }
    }
}

impl TimeoutSettings {
    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_seconds)
    }

    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 2000,
            max_delay_ms: 30_000,
            backoff_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub health_path: String,
    pub register_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            health_path: "/health".to_string(),
            register_path: "/api/v1/auth/register".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    pub fn register_url(&self) -> String {
        join_url(&self.base_url, &self.register_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub email: String,
    pub username: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@localhost".to_string(),
            username: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub server_name: String,
    pub listen_port: u16,
    /// Compose service name of the reverse proxy container.
    pub service: String,
    pub api_upstream: String,
    pub frontend_upstream: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_string(),
            listen_port: 80,
            service: "proxy".to_string(),
            api_upstream: "api:8080".to_string(),
            frontend_upstream: "frontend:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RollbackSettings {
    pub enabled: bool,
    /// Attempts per compensation; `1` means no retry.
    pub compensation_attempts: u32,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            compensation_attempts: 1,
        }
    }
}
