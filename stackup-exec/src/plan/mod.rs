//! The concrete install plan: nine steps, their compensations, and what a clean rollback
//! should leave behind.

mod actions;
mod admin;
mod credentials;
mod ownership;
mod proxy_conf;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use stackup_core::StackConfig;

pub use actions::{
    FetchSource, GenerateKeys, ReloadProxy, RemovePaths, StartServices, StopServices,
    VerifyServices, WaitForApi, WriteCredentials, WriteProxyConfig,
};
pub use admin::AdminBootstrap;
pub use credentials::{write_private_file, Credentials};
pub use ownership::Ownership;
pub use proxy_conf::render_proxy_config;

use crate::http::{parse_url, HttpError};
use crate::retry::RetryPolicy;
use crate::rollback::{Artifact, Compensations, StateProbe};
use crate::tools::Toolchain;
use crate::workflow::Step;

pub const FETCH_SOURCE: &str = "fetch_source";
pub const GENERATE_CREDENTIALS: &str = "generate_credentials";
pub const GENERATE_KEYS: &str = "generate_keys";
pub const WRITE_PROXY_CONFIG: &str = "write_proxy_config";
pub const START_SERVICES: &str = "start_services";
pub const VERIFY_SERVICES: &str = "verify_services";
pub const RELOAD_PROXY: &str = "reload_proxy";
pub const WAIT_FOR_API: &str = "wait_for_api";
pub const BOOTSTRAP_ADMIN: &str = "bootstrap_admin";

/// Install order. Uninstall undoes the same list in reverse.
pub const INSTALL_STEPS: [&str; 9] = [
    FETCH_SOURCE,
    GENERATE_CREDENTIALS,
    GENERATE_KEYS,
    WRITE_PROXY_CONFIG,
    START_SERVICES,
    VERIFY_SERVICES,
    RELOAD_PROXY,
    WAIT_FOR_API,
    BOOTSTRAP_ADMIN,
];

/// Slack on top of the readiness budget so the poller, not the step deadline, reports
/// a slow service.
const VERIFY_GRACE: Duration = Duration::from_secs(30);

pub struct InstallPlan {
    steps: Vec<Step>,
    compensations: Compensations,
    /// Steps that may find their artifact from an earlier install.
    owners: BTreeMap<String, Ownership>,
    probe: Option<StateProbe>,
}

impl InstallPlan {
    pub fn install(
        config: Arc<StackConfig>,
        tools: &Toolchain,
        credentials: Arc<Credentials>,
    ) -> Result<Self, HttpError> {
        let retry = RetryPolicy::from(&config.retry);
        let health_url = parse_url(&config.api.health_url())?;
        let register_url = parse_url(&config.api.register_url())?;
        let owners: BTreeMap<String, Ownership> = [
            FETCH_SOURCE,
            GENERATE_CREDENTIALS,
            GENERATE_KEYS,
            WRITE_PROXY_CONFIG,
            START_SERVICES,
        ]
        .into_iter()
        .map(|name| (name.to_string(), Ownership::new()))
        .collect();
        let owned = |name: &str| owners.get(name).cloned().unwrap_or_default();

        let steps = vec![
            Step::new(
                FETCH_SOURCE,
                FetchSource {
                    fetcher: tools.fetcher.clone(),
                    repository: config.source.repository.clone(),
                    revision: config.source.revision.clone(),
                    dest: config.source_dir(),
                    owned: owned(FETCH_SOURCE),
                },
            )
            .with_compensation(RemovePaths::one(config.source_dir())),
            Step::new(
                GENERATE_CREDENTIALS,
                WriteCredentials {
                    config: config.clone(),
                    credentials: credentials.clone(),
                    owned: owned(GENERATE_CREDENTIALS),
                },
            )
            .with_compensation(RemovePaths::one(config.env_file())),
            Step::new(
                GENERATE_KEYS,
                GenerateKeys {
                    keys: tools.keys.clone(),
                    private_key: config.deploy_key(),
                    public_key: config.deploy_key_pub(),
                    comment: format!("{}-deploy", config.project),
                    owned: owned(GENERATE_KEYS),
                },
            )
            .with_compensation(RemovePaths {
                paths: vec![config.deploy_key(), config.deploy_key_pub()],
            }),
            Step::new(
                WRITE_PROXY_CONFIG,
                WriteProxyConfig {
                    config: config.clone(),
                    owned: owned(WRITE_PROXY_CONFIG),
                },
            )
            .with_compensation(RemovePaths::one(config.proxy_config_file())),
            Step::new(
                START_SERVICES,
                StartServices {
                    compose: tools.compose.clone(),
                    discovery: tools.discovery.clone(),
                    services: config.services.clone(),
                    owned: owned(START_SERVICES),
                },
            )
            .with_compensation(StopServices(tools.compose.clone())),
            Step::new(
                VERIFY_SERVICES,
                VerifyServices {
                    poller: tools.poller(),
                    services: config.services.clone(),
                    timeout: config.timeouts.health(),
                    poll_interval: config.timeouts.poll_interval(),
                },
            )
            .with_timeout(config.timeouts.health() + VERIFY_GRACE),
            Step::new(RELOAD_PROXY, ReloadProxy(tools.proxy.clone())),
            Step::new(
                WAIT_FOR_API,
                WaitForApi {
                    http: tools.http.clone(),
                    url: health_url,
                    request_timeout: config.api.request_timeout(),
                    policy: retry.clone(),
                },
            ),
            Step::new(
                BOOTSTRAP_ADMIN,
                AdminBootstrap::new(
                    tools.http.clone(),
                    register_url,
                    config.admin.email.clone(),
                    config.admin.username.clone(),
                    credentials,
                )
                .with_policy(retry)
                .with_request_timeout(config.api.request_timeout()),
            ),
        ];

        let probe = state_probe(&config).with_discovery(tools.discovery.clone());
        let mut plan = Self::from_steps(steps).with_probe(probe);
        plan.owners = owners;
        Ok(plan)
    }

    /// A plan over arbitrary steps, with no leftover probe.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        let compensations = Compensations::from_steps(&steps);
        Self {
            steps,
            compensations,
            owners: BTreeMap::new(),
            probe: None,
        }
    }

    pub fn with_probe(mut self, probe: StateProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Same shape, no side effects. The leftover probe is dropped too, since nothing was
    /// created that could be left over.
    pub fn into_dry_run(self) -> Self {
        let steps = self.steps.into_iter().map(Step::into_dry_run).collect();
        Self::from_steps(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Every compensation, whoever created the artifact. Uninstall undoes all of them.
    pub fn compensations(&self) -> &Compensations {
        &self.compensations
    }

    /// Compensations for a failed install. Steps that reused an earlier install's artifact
    /// are left out, so rollback skips them and the artifact stays.
    pub fn rollback_compensations(&self) -> Compensations {
        let mut compensations = self.compensations.clone();
        compensations.retain(|step| self.owners.get(step).map_or(true, Ownership::is_claimed));
        compensations
    }

    pub fn probe(&self) -> Option<&StateProbe> {
        self.probe.as_ref()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }
}

/// Everything the install creates, tagged with the step that removes it.
fn state_probe(config: &StackConfig) -> StateProbe {
    let mut artifacts = vec![
        Artifact::path("source directory", config.source_dir()).removed_by(FETCH_SOURCE),
        Artifact::path("credentials file", config.env_file()).removed_by(GENERATE_CREDENTIALS),
        Artifact::path("deploy key", config.deploy_key()).removed_by(GENERATE_KEYS),
        Artifact::path("deploy public key", config.deploy_key_pub()).removed_by(GENERATE_KEYS),
        Artifact::path("proxy config", config.proxy_config_file()).removed_by(WRITE_PROXY_CONFIG),
    ];
    artifacts.extend(
        config
            .services
            .iter()
            .map(|id| Artifact::service(id.as_str()).removed_by(START_SERVICES)),
    );
    StateProbe::new(artifacts)
}
