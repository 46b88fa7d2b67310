//! Tests for config file resolution and graceful degradation
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that set
//! or clear VDUB_CONFIG are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use vdub_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use vdub_common::Error;

#[test]
#[serial]
fn test_cli_path_has_highest_priority() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/vdub-from-env.toml");

    let cli = PathBuf::from("/tmp/vdub-from-cli.toml");
    let resolved = resolve_config_path(Some(&cli));

    assert_eq!(resolved, Some(cli));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/vdub-from-env.toml");

    let resolved = resolve_config_path(None);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/vdub-from-env.toml")));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = TomlConfig::resolve(Some(&missing)).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_load_file_from_env_var() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [logging]
        level = "debug"

        [services]
        base_url = "http://speech.internal:9000"
        timeout_secs = 30
        "#,
    )
    .unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::resolve(None).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.services.base_url, "http://speech.internal:9000");
    assert_eq!(config.services.timeout_secs, 30);
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "workspace_root = [not valid").unwrap();

    let result = TomlConfig::load(&path);

    assert!(matches!(result, Err(Error::Config(_))));
}
