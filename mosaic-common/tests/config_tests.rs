//! Configuration loading and service URL resolution tests
//!
//! Tests that manipulate MOSAIC_SERVICE_URL are marked with #[serial]
//! so they never observe each other's environment.

use mosaic_common::config::{
    load_config, load_toml_config, resolve_service_url, TomlConfig,
    SERVICE_URL_ENV,
};
use mosaic_common::tiles::DEFAULT_SERVICE_URL;
use mosaic_common::Error;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_explicit_path_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        service_url = "http://10.0.0.5:8765"
        sampling_stride = 3

        [fetch]
        timeout_secs = 5

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.service_url.as_deref(), Some("http://10.0.0.5:8765"));
    assert_eq!(config.sampling_stride, 3);
    assert_eq!(config.fetch.timeout_secs, 5);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_unparsable_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "service_url = [not toml").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[fetch]\ntimeout_secs = 0\n").unwrap();

    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
}

#[test]
fn test_every_section_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
service_url = "https://tiles.example.org"
sampling_stride = 3

[tiles]
width = 8
height = 12

[fetch]
timeout_secs = 5

[logging]
level = "debug"
file = "/tmp/mosaic.log"
"#,
    )
    .unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.service_url.as_deref(), Some("https://tiles.example.org"));
    assert_eq!(loaded.sampling_stride, 3);
    assert_eq!((loaded.tiles.width, loaded.tiles.height), (8, 12));
    assert_eq!(loaded.fetch.timeout_secs, 5);
    assert_eq!(loaded.logging.level, "debug");
    assert_eq!(
        loaded.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/mosaic.log"))
    );
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(SERVICE_URL_ENV, "http://from-env:1");
    let config = TomlConfig {
        service_url: Some("http://from-toml:2".to_string()),
        ..TomlConfig::default()
    };

    let url = resolve_service_url(Some("http://from-cli:3/"), &config).unwrap();
    env::remove_var(SERVICE_URL_ENV);

    assert_eq!(url, "http://from-cli:3");
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(SERVICE_URL_ENV, "http://from-env:1");
    let config = TomlConfig {
        service_url: Some("http://from-toml:2".to_string()),
        ..TomlConfig::default()
    };

    let url = resolve_service_url(None, &config).unwrap();
    env::remove_var(SERVICE_URL_ENV);

    assert_eq!(url, "http://from-env:1");
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(SERVICE_URL_ENV);

    let config = TomlConfig {
        service_url: Some("http://from-toml:2".to_string()),
        ..TomlConfig::default()
    };
    assert_eq!(
        resolve_service_url(None, &config).unwrap(),
        "http://from-toml:2"
    );

    let url = resolve_service_url(None, &TomlConfig::default()).unwrap();
    assert_eq!(url, DEFAULT_SERVICE_URL);
}

#[test]
#[serial]
fn test_malformed_url_rejected() {
    env::remove_var(SERVICE_URL_ENV);
    let result = resolve_service_url(Some("tiles.local"), &TomlConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}
