#![forbid(unsafe_code)]

use gw_api::{Config, ConfigError, UrlProvider};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn empty_document_yields_defaults() {
    let config = Config::from_yaml_str("{}").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.storage.busy_timeout_ms, 5_000);
    assert_eq!(config.git.default_branch, "main");
    assert_eq!(config.api.request_timeout_ms, 30_000);
}

#[test]
fn sections_override_defaults_field_by_field() {
    let yaml = r#"
storage:
  data_dir: /var/lib/gitward
  strict_triggers: true
git:
  repos_root: /srv/git
api:
  internal_base_url: http://gitward.internal:3000/
  request_timeout_ms: 1500
"#;
    let config = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/gitward"));
    assert_eq!(config.storage.busy_timeout_ms, 5_000);

    let store = config.store_config();
    assert!(store.strict_triggers);
    assert_eq!(store.busy_timeout, Duration::from_secs(5));

    let git = config.git_service_config();
    assert_eq!(git.repos_root, PathBuf::from("/srv/git"));
    assert_eq!(git.tmp_dir, PathBuf::from("data/tmp"));

    assert_eq!(
        config.url_provider().internal_api_url(),
        "http://gitward.internal:3000"
    );
    let remaining = config.request_context().remaining().unwrap();
    assert!(remaining <= Duration::from_millis(1500));
}

#[test]
fn invalid_values_are_rejected() {
    let zero_timeout = "api:\n  request_timeout_ms: 0\n";
    assert!(matches!(
        Config::from_yaml_str(zero_timeout),
        Err(ConfigError::Invalid(_))
    ));

    let blank_url = "api:\n  internal_base_url: '  '\n";
    assert!(matches!(
        Config::from_yaml_str(blank_url),
        Err(ConfigError::Invalid(_))
    ));

    assert!(matches!(
        Config::from_yaml_str("storage:\n  unknown_knob: 1\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn load_reads_from_disk_and_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gitward.yaml");
    std::fs::write(&path, "git:\n  default_branch: trunk\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.git.default_branch, "trunk");

    let err = Config::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("missing.yaml"));
}
