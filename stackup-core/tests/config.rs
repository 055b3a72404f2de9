use std::path::PathBuf;

use stackup_core::{load_config, parse_config_str, ConfigError, ConfigFormat, StackConfig};

fn sample_yaml() -> &'static str {
    r#"
project: acme
install_dir: /srv/acme
source:
  repository: https://example.com/acme/stack.git
  revision: v1.2.0
services: [db, api]
timeouts:
  step_seconds: 120
  health_seconds: 60
retry:
  max_attempts: 3
"#
}

#[test]
fn parse_yaml_fills_defaults() {
    let cfg = parse_config_str(sample_yaml(), ConfigFormat::Yaml).unwrap();
    assert_eq!(cfg.project, "acme");
    assert_eq!(cfg.services, vec!["db".to_string(), "api".to_string()]);
    assert_eq!(cfg.timeouts.poll_interval_ms, 2000);
    assert_eq!(cfg.retry.max_attempts, 3);
    assert_eq!(cfg.retry.backoff_factor, 1.5);
    assert_eq!(cfg.source.compose_file, PathBuf::from("docker-compose.yml"));
}

#[test]
fn parse_auto_detects_json() {
    let json = r#"{ "project": "acme", "services": ["api"] }"#;
    let cfg = parse_config_str(json, ConfigFormat::Auto).unwrap();
    assert_eq!(cfg.project, "acme");
    assert_eq!(cfg.services, vec!["api".to_string()]);
}

#[test]
fn empty_document_is_default_config() {
    let cfg = parse_config_str("   \n", ConfigFormat::Auto).unwrap();
    assert_eq!(cfg, StackConfig::default());
}

#[test]
fn unknown_fields_are_rejected() {
    let err = parse_config_str("projekt: typo\n", ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn load_config_reads_and_validates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stackup.yaml");
    std::fs::write(&path, sample_yaml()).unwrap();

    let cfg = load_config(Some(&path)).unwrap();
    assert_eq!(cfg.install_dir, PathBuf::from("/srv/acme"));
    assert_eq!(cfg.env_file(), PathBuf::from("/srv/acme/.env"));
}

#[test]
fn load_config_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stackup.yml");
    std::fs::write(&path, "timeouts:\n  step_seconds: 10\n  health_seconds: 60\n").unwrap();

    let err = load_config(Some(&path)).unwrap_err();
    let v = match err {
        ConfigError::Invalid(v) => v,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert!(v
        .violations
        .iter()
        .any(|x| x.path == "timeouts.health_seconds"));
}

#[test]
fn load_config_reports_missing_file() {
    let err = load_config(Some(std::path::Path::new("/nonexistent/stackup.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn no_path_yields_defaults() {
    let cfg = load_config(None).unwrap();
    assert_eq!(cfg, StackConfig::default());
}
