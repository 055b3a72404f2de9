use std::collections::BTreeSet;

use crate::config::{
    ApiConfig, ProxyConfig, RetrySettings, RollbackSettings, SourceConfig, StackConfig,
    TimeoutSettings,
};

use super::validator::{Validator, PROJECT_RE, SERVICE_RE};

pub(super) fn validate_project(v: &mut Validator, config: &StackConfig) {
    if !PROJECT_RE.is_match(&config.project) {
        v.push(
            "project",
            "must start with a lowercase letter or digit and contain only [a-z0-9_-]",
        );
    }
    if config.install_dir.as_os_str().is_empty() {
        v.push("install_dir", "must not be empty");
    }
}

pub(super) fn validate_source(v: &mut Validator, source: &SourceConfig) {
    v.require_non_empty("source.repository", &source.repository);
    v.require_non_empty("source.revision", &source.revision);
    if source.compose_file.is_absolute() {
        v.push("source.compose_file", "must be relative to the source tree");
    }
}

pub(super) fn validate_services(v: &mut Validator, services: &[String]) {
    if services.is_empty() {
        v.push("services", "at least one service is required");
    }
    let mut seen = BTreeSet::new();
    for (i, id) in services.iter().enumerate() {
        let path = format!("services[{i}]");
        if !SERVICE_RE.is_match(id) {
            v.push(&path, format!("invalid service id `{id}`"));
        }
        if !seen.insert(id.as_str()) {
            v.push(&path, format!("duplicate service id `{id}`"));
        }
    }
}

pub(super) fn validate_timeouts(v: &mut Validator, t: &TimeoutSettings) {
    if t.step_seconds == 0 {
        v.push("timeouts.step_seconds", "must be greater than zero");
    }
    if t.poll_interval_ms == 0 {
        v.push("timeouts.poll_interval_ms", "must be greater than zero");
    }
    // The readiness wait runs inside a single step and has to fit in its budget.
    if t.health_seconds > t.step_seconds {
        v.push(
            "timeouts.health_seconds",
            format!(
                "must not exceed timeouts.step_seconds ({} > {})",
                t.health_seconds, t.step_seconds
            ),
        );
    }
}

pub(super) fn validate_retry(v: &mut Validator, r: &RetrySettings) {
    if r.max_attempts == 0 {
        v.push("retry.max_attempts", "must be at least 1");
    }
    if !r.backoff_factor.is_finite() || r.backoff_factor < 1.0 {
        v.push("retry.backoff_factor", "must be a finite number >= 1.0");
    }
    if r.initial_delay_ms > r.max_delay_ms {
        v.push("retry.initial_delay_ms", "must not exceed retry.max_delay_ms");
    }
}

pub(super) fn validate_api(v: &mut Validator, api: &ApiConfig) {
    match url::Url::parse(&api.base_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        Ok(u) => v.push("api.base_url", format!("unsupported scheme `{}`", u.scheme())),
        Err(e) => v.push("api.base_url", format!("invalid URL: {e}")),
    }
    if !api.health_path.starts_with('/') {
        v.push("api.health_path", "must start with `/`");
    }
    if !api.register_path.starts_with('/') {
        v.push("api.register_path", "must start with `/`");
    }
    if api.request_timeout_ms == 0 {
        v.push("api.request_timeout_ms", "must be greater than zero");
    }
}

pub(super) fn validate_proxy(v: &mut Validator, proxy: &ProxyConfig) {
    v.require_non_empty("proxy.server_name", &proxy.server_name);
    v.require_non_empty("proxy.service", &proxy.service);
    v.require_non_empty("proxy.api_upstream", &proxy.api_upstream);
    v.require_non_empty("proxy.frontend_upstream", &proxy.frontend_upstream);
    if proxy.listen_port == 0 {
        v.push("proxy.listen_port", "must be greater than zero");
    }
}

pub(super) fn validate_rollback(v: &mut Validator, r: &RollbackSettings) {
    if r.compensation_attempts == 0 {
        v.push("rollback.compensation_attempts", "must be at least 1");
    }
}
