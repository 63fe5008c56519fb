//! Unit tests for configuration loading and graceful degradation
//!
//! Tests that manipulate environment variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use intel_common::config::{
    load_toml_config, resolve_config_path, resolve_secret, TomlConfig, CONFIG_PATH_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(Some(&missing)).unwrap();

    assert_eq!(config.server.port, 5790);
    assert!(config.completion.api_key.is_none());
}

#[test]
fn test_no_path_uses_defaults() {
    let config = load_toml_config(None).unwrap();
    assert_eq!(config.search.model, "sonar");
}

#[test]
fn test_loads_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
host = "0.0.0.0"
port = 8080

[completion]
api_key = "toml-completion-key"
long_form_models = ["big", "medium", "small"]

[speech]
base_url = "http://speech.local"
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.completion.api_key.as_deref(), Some("toml-completion-key"));
    assert_eq!(config.completion.long_form_models, vec!["big", "medium", "small"]);
    assert_eq!(config.speech.base_url, "http://speech.local");
    assert_eq!(config.pipeline.search_timeout_secs, 45);
}

#[test]
fn test_malformed_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[server\nport = \"not a number\"").unwrap();

    let result = load_toml_config(Some(&path));
    assert!(result.is_err(), "Malformed TOML should not silently default");
}

#[test]
fn test_round_trips_through_toml() {
    let mut config = TomlConfig::default();
    config.pipeline.max_concurrent_searches = 3;

    let text = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&text).unwrap();

    assert_eq!(parsed.pipeline.max_concurrent_searches, 3);
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    env::set_var(CONFIG_PATH_ENV, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_PATH_ENV, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_secret_env_beats_toml() {
    env::set_var("INTEL_TEST_SECRET", "env-key");

    let key = resolve_secret("Test key", "INTEL_TEST_SECRET", Some("toml-key"));
    assert_eq!(key.as_deref(), Some("env-key"));

    env::remove_var("INTEL_TEST_SECRET");
}

#[test]
#[serial]
fn test_secret_falls_back_to_toml() {
    env::remove_var("INTEL_TEST_SECRET");

    let key = resolve_secret("Test key", "INTEL_TEST_SECRET", Some("toml-key"));
    assert_eq!(key.as_deref(), Some("toml-key"));
}

#[test]
#[serial]
fn test_blank_secrets_are_absent() {
    env::set_var("INTEL_TEST_SECRET", "   ");

    let key = resolve_secret("Test key", "INTEL_TEST_SECRET", Some(""));
    assert!(key.is_none());

    env::remove_var("INTEL_TEST_SECRET");
}
