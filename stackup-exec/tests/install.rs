use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackup_core::{ProbeHealth, ServiceState, StackConfig};
use stackup_exec::health::{DiscoveryError, QueryError, ServiceDiscovery, ServiceHandle, StatusQuery};
use stackup_exec::http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use stackup_exec::plan::{self as step, Credentials, InstallPlan};
use stackup_exec::tools::{ComposeRunner, KeyGenerator, ProxyLoader, SourceFetcher, ToolError, Toolchain};
use stackup_exec::workflow::NoOpEventSink;
use stackup_exec::Installer;

/// In-memory stand-in for git, ssh-keygen, docker and the API.
#[derive(Default)]
struct FakeHost {
    calls: Mutex<Vec<String>>,
    up: AtomicBool,
    fail_up: bool,
    refuse_down: bool,
    api_down: bool,
}

impl FakeHost {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn toolchain(self: &Arc<Self>) -> Toolchain {
        Toolchain {
            fetcher: self.clone(),
            keys: self.clone(),
            compose: self.clone(),
            proxy: self.clone(),
            discovery: self.clone(),
            status: self.clone(),
            http: self.clone(),
        }
    }
}

#[async_trait]
impl SourceFetcher for FakeHost {
    async fn fetch(&self, _repository: &str, revision: &str, dest: &Path) -> Result<(), ToolError> {
        self.record(format!("fetch {revision}"));
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        std::fs::write(dest.join("docker-compose.yml"), "services: {}\n").unwrap();
        Ok(())
    }
}

#[async_trait]
impl KeyGenerator for FakeHost {
    async fn generate(&self, path: &Path, _comment: &str) -> Result<(), ToolError> {
        self.record("keygen");
        std::fs::write(path, "private").unwrap();
        std::fs::write(path.with_extension("pub"), "public").unwrap();
        Ok(())
    }
}

#[async_trait]
impl ComposeRunner for FakeHost {
    async fn up(&self) -> Result<(), ToolError> {
        self.record("up");
        if self.fail_up {
            return Err(ToolError::Exit {
                command: "docker compose up -d".into(),
                code: 1,
                stderr: "port 80 already allocated".into(),
            });
        }
        self.up.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn down(&self) -> Result<(), ToolError> {
        self.record("down");
        if self.refuse_down {
            return Err(ToolError::Exit {
                command: "docker compose down".into(),
                code: 1,
                stderr: "daemon busy".into(),
            });
        }
        self.up.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProxyLoader for FakeHost {
    async fn reload(&self) -> Result<(), ToolError> {
        self.record("reload");
        Ok(())
    }
}

#[async_trait]
impl ServiceDiscovery for FakeHost {
    async fn resolve(&self, service_id: &str) -> Result<Option<ServiceHandle>, DiscoveryError> {
        Ok(self
            .up
            .load(Ordering::SeqCst)
            .then(|| ServiceHandle::new(service_id, format!("{service_id}0123456789abcdef"))))
    }
}

#[async_trait]
impl StatusQuery for FakeHost {
    async fn query(&self, _handle: &ServiceHandle) -> Result<ServiceState, QueryError> {
        Ok(ServiceState {
            running: true,
            health: ProbeHealth::Healthy,
            exit_code: None,
        })
    }
}

#[async_trait]
impl HttpClient for FakeHost {
    async fn send(&self, req: HttpRequest, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.record(format!("{} {}", req.method, req.url.path()));
        let status = match req.method.as_str() {
            _ if self.api_down => 503,
            "POST" => 201,
            _ => 200,
        };
        Ok(HttpResponse {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        })
    }
}

fn config(dir: &Path) -> Arc<StackConfig> {
    let mut config = StackConfig::default();
    config.install_dir = dir.to_path_buf();
    config.services = vec!["api".into(), "db".into()];
    config.timeouts.health_seconds = 5;
    config.timeouts.poll_interval_ms = 10;
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    Arc::new(config)
}

fn build(config: &Arc<StackConfig>, host: &Arc<FakeHost>) -> InstallPlan {
    InstallPlan::install(config.clone(), &host.toolchain(), Arc::new(Credentials::generate())).unwrap()
}

/// Builds the plan the way the CLI does, reusing credentials already on disk.
async fn build_from_disk(config: &Arc<StackConfig>, host: &Arc<FakeHost>) -> InstallPlan {
    let credentials = Credentials::load_or_generate(&config.env_file()).await.unwrap();
    InstallPlan::install(config.clone(), &host.toolchain(), Arc::new(credentials)).unwrap()
}

fn artifacts(config: &StackConfig) -> Vec<PathBuf> {
    vec![
        config.source_dir(),
        config.env_file(),
        config.deploy_key(),
        config.deploy_key_pub(),
        config.proxy_config_file(),
    ]
}

#[test]
fn plan_has_the_install_steps_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let plan = build(&config, &Arc::new(FakeHost::default()));

    assert_eq!(plan.step_names(), step::INSTALL_STEPS);
    assert_eq!(plan.compensations().len(), 5);
    // nothing has been created yet, so a failed install has nothing of its own to undo
    assert!(plan.rollback_compensations().is_empty());
    for name in [step::VERIFY_SERVICES, step::RELOAD_PROXY, step::WAIT_FOR_API, step::BOOTSTRAP_ADMIN] {
        assert!(plan.compensations().get(name).is_none(), "{name}");
    }
    let verify = &plan.steps()[5];
    assert_eq!(verify.name(), step::VERIFY_SERVICES);
    assert_eq!(verify.timeout(), Some(Duration::from_secs(35)));
}

#[tokio::test]
async fn install_then_uninstall_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let host = Arc::new(FakeHost::default());
    let plan = build(&config, &host);
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));

    let report = installer.install(&plan).await.unwrap();

    assert!(report.succeeded(), "{:?}", report.outcome.failure());
    assert!(report.rollback.is_none());
    for path in artifacts(&config) {
        assert!(path.exists(), "{} missing", path.display());
    }
    let env = std::fs::read_to_string(config.env_file()).unwrap();
    assert!(env.contains("POSTGRES_PASSWORD="));
    assert_eq!(
        host.calls(),
        [
            "fetch main",
            "keygen",
            "up",
            "reload",
            "GET /health",
            "POST /api/v1/auth/register"
        ]
    );

    let removed = installer.uninstall(&plan).await;

    assert!(removed.rollback.succeeded, "{:?}", removed.rollback.failures);
    assert!(removed.rollback.leftovers.is_empty(), "{:?}", removed.rollback.leftovers);
    assert_eq!(
        removed.rollback.compensated,
        [
            step::START_SERVICES,
            step::WRITE_PROXY_CONFIG,
            step::GENERATE_KEYS,
            step::GENERATE_CREDENTIALS,
            step::FETCH_SOURCE
        ]
    );
    for path in artifacts(&config) {
        assert!(!path.exists(), "{} survived", path.display());
    }
}

#[tokio::test]
async fn failed_start_rolls_back_only_the_earlier_steps() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let host = Arc::new(FakeHost {
        fail_up: true,
        ..FakeHost::default()
    });
    let plan = build(&config, &host);

    let report = Installer::new(config.clone(), Arc::new(NoOpEventSink))
        .install(&plan)
        .await
        .unwrap();

    assert_eq!(report.outcome.failed_step(), Some(step::START_SERVICES));
    assert!(report
        .outcome
        .error()
        .unwrap()
        .contains("port 80 already allocated"));
    let rollback = report.rollback.expect("rollback ran");
    assert!(rollback.succeeded);
    assert_eq!(
        rollback.compensated,
        [
            step::WRITE_PROXY_CONFIG,
            step::GENERATE_KEYS,
            step::GENERATE_CREDENTIALS,
            step::FETCH_SOURCE
        ]
    );
    // the failed step itself is not compensated
    assert!(!host.calls().contains(&"down".to_string()));
    assert!(rollback.leftovers.is_empty(), "{:?}", rollback.leftovers);
}

#[tokio::test]
async fn failed_compensation_is_reported_with_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let host = Arc::new(FakeHost {
        refuse_down: true,
        ..FakeHost::default()
    });
    let plan = build(&config, &host);
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));
    installer.install(&plan).await.unwrap();

    let removed = installer.uninstall(&plan).await;

    assert!(!removed.rollback.succeeded);
    assert_eq!(removed.rollback.failures.len(), 1);
    assert!(removed.rollback.failures[0].starts_with("start_services: "));
    assert_eq!(removed.rollback.compensated.len(), 4);
    assert_eq!(
        removed.rollback.leftovers,
        ["service api still has container api012345678", "service db still has container db0123456789"]
    );
}

#[tokio::test]
async fn disabled_rollback_leaves_completed_steps_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = (*config(dir.path())).clone();
    cfg.rollback.enabled = false;
    let config = Arc::new(cfg);
    let host = Arc::new(FakeHost {
        fail_up: true,
        ..FakeHost::default()
    });
    let plan = build(&config, &host);

    let report = Installer::new(config.clone(), Arc::new(NoOpEventSink))
        .install(&plan)
        .await
        .unwrap();

    assert!(!report.succeeded());
    assert!(report.rollback.is_none());
    assert!(config.source_dir().exists());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let host = Arc::new(FakeHost::default());
    let plan = build(&config, &host).into_dry_run();
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));

    let report = installer.install(&plan).await.unwrap();
    assert_eq!(report.outcome.completed_steps(), step::INSTALL_STEPS);

    let removed = installer.uninstall(&plan).await;
    assert!(removed.rollback.succeeded);
    assert_eq!(removed.rollback.compensated.len(), 5);

    assert!(host.calls().is_empty());
    assert!(plan.probe().is_none());
    for path in artifacts(&config) {
        assert!(!path.exists(), "{} created in dry run", path.display());
    }
}

#[tokio::test]
async fn rerun_keeps_existing_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));
    let first = Arc::new(FakeHost::default());
    assert!(installer.install(&build_from_disk(&config, &first).await).await.unwrap().succeeded());
    let env_before = std::fs::read_to_string(config.env_file()).unwrap();

    let second = Arc::new(FakeHost::default());
    let report = installer.install(&build_from_disk(&config, &second).await).await.unwrap();

    assert!(report.succeeded(), "{:?}", report.outcome.failure());
    assert_eq!(std::fs::read_to_string(config.env_file()).unwrap(), env_before);
    assert_eq!(
        second.calls(),
        ["up", "reload", "GET /health", "POST /api/v1/auth/register"]
    );
}

#[tokio::test]
async fn failed_rerun_leaves_the_existing_install_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));
    let first = Arc::new(FakeHost::default());
    assert!(installer.install(&build_from_disk(&config, &first).await).await.unwrap().succeeded());
    let env_before = std::fs::read_to_string(config.env_file()).unwrap();

    let second = Arc::new(FakeHost {
        fail_up: true,
        ..FakeHost::default()
    });
    let report = installer.install(&build_from_disk(&config, &second).await).await.unwrap();

    assert_eq!(report.outcome.failed_step(), Some(step::START_SERVICES));
    assert_eq!(second.calls(), ["up"]);
    let rollback = report.rollback.expect("rollback ran");
    assert!(rollback.is_clean(), "{rollback:?}");
    assert!(rollback.compensated.is_empty());
    assert_eq!(
        rollback.skipped,
        [
            step::WRITE_PROXY_CONFIG,
            step::GENERATE_KEYS,
            step::GENERATE_CREDENTIALS,
            step::FETCH_SOURCE
        ]
    );
    for path in artifacts(&config) {
        assert!(path.exists(), "{} removed", path.display());
    }
    assert_eq!(std::fs::read_to_string(config.env_file()).unwrap(), env_before);
}

#[tokio::test]
async fn failed_rerun_does_not_stop_a_running_stack() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));
    let first = Arc::new(FakeHost::default());
    assert!(installer.install(&build_from_disk(&config, &first).await).await.unwrap().succeeded());

    let running = Arc::new(FakeHost {
        up: AtomicBool::new(true),
        api_down: true,
        ..FakeHost::default()
    });
    let report = installer.install(&build_from_disk(&config, &running).await).await.unwrap();

    assert_eq!(report.outcome.failed_step(), Some(step::WAIT_FOR_API));
    let rollback = report.rollback.expect("rollback ran");
    assert!(rollback.is_clean(), "{rollback:?}");
    assert!(rollback.compensated.is_empty());
    assert!(rollback.skipped.contains(&step::START_SERVICES.to_string()));
    assert!(!running.calls().contains(&"down".to_string()));
    assert!(running.up.load(Ordering::SeqCst));
    for path in artifacts(&config) {
        assert!(path.exists(), "{} removed", path.display());
    }
}

#[tokio::test]
async fn uninstall_handles_partial_and_repeated_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    std::fs::create_dir_all(config.source_dir().join(".git")).unwrap();
    std::fs::write(config.env_file(), "POSTGRES_PASSWORD=x\n").unwrap();
    let host = Arc::new(FakeHost::default());
    let plan = build(&config, &host);
    let installer = Installer::new(config.clone(), Arc::new(NoOpEventSink));

    for _ in 0..2 {
        let removed = installer.uninstall(&plan).await;
        assert!(removed.rollback.is_clean(), "{:?}", removed.rollback);
        assert_eq!(removed.rollback.compensated.len(), 5);
    }
    for path in artifacts(&config) {
        assert!(!path.exists(), "{} survived", path.display());
    }
}
