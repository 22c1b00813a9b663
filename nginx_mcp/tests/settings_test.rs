//! Settings file loading and layering.

use clap::Parser;
use nginx_mcp::config::{ConfigError, Settings};
use nginx_mcp::executor::ExecutorConfig;
use nginx_mcp::shell::Cli;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

// ============= File Loading Tests =============

#[tokio::test]
async fn test_file_values_override_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nginx_mcp.toml");
    std::fs::write(
        &path,
        r#"
host = "proxy.lan"
port = 8080
project_dir = "/srv/edge"
timeout_ms = 20000

[environment]
COMPOSE_PROJECT_NAME = "edge"
"#,
    )
    .unwrap();

    let settings = Settings::from_file(&path).await.unwrap();
    assert_eq!(settings.host, "proxy.lan");
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.project_dir, PathBuf::from("/srv/edge"));
    assert_eq!(settings.command_timeout(), Duration::from_secs(20));
    assert_eq!(settings.environment["COMPOSE_PROJECT_NAME"], "edge");
    // Untouched fields keep their defaults.
    assert_eq!(settings.service_name, "nginx");
    assert_eq!(settings.http_timeout_ms, 5000);
}

#[tokio::test]
async fn test_missing_explicit_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = Settings::load(Some(&dir.path().join("absent.toml")))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[tokio::test]
async fn test_unknown_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("typo.toml");
    std::fs::write(&path, "hots = \"localhost\"\n").unwrap();

    let err = Settings::from_file(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("typo.toml"));
}

#[tokio::test]
async fn test_zero_timeout_in_file_fails_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("zero.toml");
    std::fs::write(&path, "timeout_ms = 0\n").unwrap();

    let settings = Settings::from_file(&path).await.unwrap();
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::InvalidValue { ref key, .. }) if key == "timeout_ms"
    ));
}

// ============= Layering Tests =============

#[test]
fn test_env_then_flags_precedence() {
    let mut settings = Settings {
        port: 8080,
        ..Settings::default()
    };
    settings
        .apply_env_overlay(|key| match key {
            "NGINX_PORT" => Some("9090".to_string()),
            "NGINX_SERVICE" => Some("proxy".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(settings.port, 9090);

    let cli = Cli::parse_from(["nginx_mcp", "--port", "9191"]);
    cli.apply_overrides(&mut settings);
    assert_eq!(settings.port, 9191);
    assert_eq!(settings.service_name, "proxy");
}

#[test]
fn test_executor_config_copies_engine_fields() {
    let mut settings = Settings {
        project_dir: PathBuf::from("/srv/edge"),
        timeout_ms: 2500,
        ..Settings::default()
    };
    settings
        .environment
        .insert("DOCKER_HOST".to_string(), "unix:///run/docker.sock".to_string());

    let config = ExecutorConfig::from(&settings);
    assert_eq!(config.working_dir, PathBuf::from("/srv/edge"));
    assert_eq!(config.timeout, Duration::from_millis(2500));
    assert_eq!(config.environment, settings.environment);
}
