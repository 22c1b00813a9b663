//! Tool dispatch through `NginxMcpService`, with the execution engine replaced by
//! fakes so no docker installation is needed.

mod common;

use common::http::{closed_port, spawn_responder};
use common::{Behavior, Fakes};
use nginx_mcp::{
    config::Settings,
    executor::ExecutorConfig,
    mcp_service::{CONFIG_URI, NginxMcpService, SETTINGS_URI, TOOL_NAMES},
    shell::modes::cli::result_text,
};
use rmcp::model::{ErrorCode, JsonObject, ResourceContents};
use serde_json::json;
use std::sync::Arc;

fn service_with(settings: Settings, fakes: &Fakes) -> NginxMcpService {
    let settings = Arc::new(settings);
    let executor = Arc::new(fakes.executor(ExecutorConfig::from(settings.as_ref())));
    NginxMcpService::with_executor(settings, executor).unwrap()
}

fn echo_fakes() -> Fakes {
    Fakes::new(Behavior::EchoArgs, Behavior::EchoArgs, Behavior::EchoArgs)
}

fn args(value: serde_json::Value) -> Option<JsonObject> {
    value.as_object().cloned()
}

// ============= Command Tool Tests =============

#[tokio::test]
async fn test_container_status_runs_compose_ps() {
    let fakes = echo_fakes();
    let service = service_with(Settings::default(), &fakes);

    let result = service
        .dispatch_tool("nginx_container_status", None)
        .await
        .unwrap();

    assert_ne!(result.is_error, Some(true));
    let text = result_text(&result);
    assert!(text.starts_with("OK Container status"));
    assert!(text.contains("docker compose ps nginx"));
    assert_eq!(
        fakes.streaming.requests()[0].args,
        ["docker", "compose", "ps", "nginx"]
    );
}

#[tokio::test]
async fn test_logs_tool_passes_tail_and_since() {
    let fakes = echo_fakes();
    let settings = Settings {
        service_name: "edge".to_string(),
        ..Settings::default()
    };
    let service = service_with(settings, &fakes);

    service
        .dispatch_tool("nginx_logs", args(json!({"lines": 200, "since": "1h"})))
        .await
        .unwrap();

    assert_eq!(
        fakes.streaming.requests()[0].args,
        ["docker", "compose", "logs", "--tail", "200", "--since", "1h", "edge"]
    );
}

#[tokio::test]
async fn test_commands_run_in_project_directory() {
    let fakes = echo_fakes();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        project_dir: dir.path().to_path_buf(),
        timeout_ms: 1234,
        ..Settings::default()
    };
    let service = service_with(settings, &fakes);

    service.dispatch_tool("nginx_stop", None).await.unwrap();

    let request = &fakes.streaming.requests()[0];
    assert_eq!(request.working_dir, dir.path());
    assert_eq!(request.timeout.as_millis(), 1234);
}

#[tokio::test]
async fn test_every_command_tool_reaches_the_engine() {
    let command_tools = [
        "nginx_container_status",
        "nginx_logs",
        "nginx_config_test",
        "nginx_config_show",
        "nginx_reload",
        "nginx_restart",
        "nginx_start",
        "nginx_stop",
        "nginx_ssl_info",
        "compose_version",
    ];
    let fakes = echo_fakes();
    let service = service_with(Settings::default(), &fakes);

    for tool in command_tools {
        assert!(TOOL_NAMES.contains(&tool));
        let result = service.dispatch_tool(tool, None).await.unwrap();
        assert_ne!(result.is_error, Some(true), "{tool}");
    }
    assert_eq!(fakes.streaming.calls(), command_tools.len());
}

// ============= Failure Presentation Tests =============

#[tokio::test]
async fn test_failed_command_is_a_tool_error_not_a_protocol_error() {
    let fakes = Fakes::new(
        Behavior::Fail(1, "nginx: [emerg] unexpected \"}\""),
        Behavior::Fail(1, "nginx: [emerg] unexpected \"}\""),
        Behavior::Fail(1, "nginx: [emerg] unexpected \"}\""),
    );
    let service = service_with(Settings::default(), &fakes);

    let result = service.dispatch_tool("nginx_config_test", None).await.unwrap();

    assert_eq!(result.is_error, Some(true));
    let text = result_text(&result);
    assert!(text.starts_with("FAIL Configuration test"));
    assert!(text.contains("All execution methods failed."));
    assert!(text.contains("Command exit code: 1"));
    assert!(text.contains("Result: command ran but reported an error"));
}

#[tokio::test]
async fn test_unlaunchable_command_is_reported_as_not_run() {
    let fakes = Fakes::new(
        Behavior::SpawnFail("Failed to spawn 'docker': No such file or directory"),
        Behavior::SpawnFail("Failed to run shell: No such file or directory"),
        Behavior::SpawnFail("Failed to spawn 'docker': No such file or directory"),
    );
    let service = service_with(Settings::default(), &fakes);

    let result = service.dispatch_tool("nginx_reload", None).await.unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(result_text(&result).contains("Result: command could not be run at all"));
}

#[tokio::test]
async fn test_fallback_is_reported() {
    let fakes = Fakes::new(
        Behavior::SpawnFail("Failed to spawn 'docker': Operation not permitted"),
        Behavior::Succeed("Docker Compose version v2.29.1"),
        Behavior::Succeed("unused"),
    );
    let service = service_with(Settings::default(), &fakes);

    let result = service.dispatch_tool("compose_version", None).await.unwrap();
    let text = result_text(&result);

    assert_ne!(result.is_error, Some(true));
    assert!(text.contains("Strategy: buffered (fallback)"));
    assert!(text.contains("Operation not permitted"));
}

#[tokio::test]
async fn test_unknown_tool_and_bad_params_are_protocol_errors() {
    let fakes = echo_fakes();
    let service = service_with(Settings::default(), &fakes);

    let err = service.dispatch_tool("nginx_destroy", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

    let err = service
        .dispatch_tool("nginx_ssl_info", args(json!({"cert_name": "../../etc/shadow"})))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

    assert_eq!(fakes.streaming.calls(), 0);
}

// ============= Template Tests =============

#[tokio::test]
async fn test_ssl_template_does_not_run_commands() {
    let fakes = echo_fakes();
    let service = service_with(Settings::default(), &fakes);

    let result = service
        .dispatch_tool(
            "nginx_ssl_template",
            args(json!({"domain": "shop.example.org", "upstream": "http://shop:3000"})),
        )
        .await
        .unwrap();

    let text = result_text(&result);
    assert!(text.contains("server_name shop.example.org;"));
    assert!(text.contains("proxy_pass http://shop:3000;"));
    assert_eq!(fakes.streaming.calls(), 0);
}

// ============= HTTP Tool Tests =============

#[tokio::test]
async fn test_status_tool_returns_stub_status_body() {
    let port = spawn_responder(200, "Active connections: 3\nReading: 0 Writing: 1 Waiting: 2\n").await;
    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port,
        ..Settings::default()
    };
    let service = service_with(settings, &echo_fakes());

    let result = service.dispatch_tool("nginx_status", None).await.unwrap();
    let text = result_text(&result);

    assert_ne!(result.is_error, Some(true));
    assert!(text.contains("HTTP status: 200"));
    assert!(text.contains("Active connections: 3"));
}

#[tokio::test]
async fn test_health_tool_flags_server_errors() {
    let port = spawn_responder(502, "bad gateway").await;
    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port,
        ..Settings::default()
    };
    let service = service_with(settings, &echo_fakes());

    let result = service
        .dispatch_tool("nginx_health", args(json!({"path": "/healthz"})))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(result_text(&result).contains("HTTP status: 502"));
}

#[tokio::test]
async fn test_unreachable_proxy_still_answers() {
    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port: closed_port().await,
        http_timeout_ms: 1000,
        ..Settings::default()
    };
    let service = service_with(settings, &echo_fakes());

    let result = service.dispatch_tool("nginx_status", None).await.unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(result_text(&result).starts_with("FAIL Proxy status"));
}

// ============= Resource Tests =============

fn resource_text(contents: &ResourceContents) -> &str {
    match contents {
        ResourceContents::TextResourceContents { text, .. } => text,
        other => panic!("expected text contents, got {other:?}"),
    }
}

#[tokio::test]
async fn test_settings_resource_is_json() {
    let settings = Settings {
        port: 8088,
        ..Settings::default()
    };
    let service = service_with(settings, &echo_fakes());

    let result = service.read_resource_uri(SETTINGS_URI).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(resource_text(&result.contents[0])).unwrap();
    assert_eq!(value["port"], 8088);
    assert_eq!(value["service_name"], "nginx");
}

#[tokio::test]
async fn test_config_resource_runs_nginx_dump() {
    let fakes = Fakes::new(
        Behavior::Succeed("# configuration file /etc/nginx/nginx.conf:\nevents {}\n"),
        Behavior::Succeed("unused"),
        Behavior::Succeed("unused"),
    );
    let service = service_with(Settings::default(), &fakes);

    let result = service.read_resource_uri(CONFIG_URI).await.unwrap();
    assert!(resource_text(&result.contents[0]).starts_with("# configuration file"));
    assert_eq!(
        fakes.streaming.requests()[0].args,
        ["docker", "compose", "exec", "-T", "nginx", "nginx", "-T"]
    );
}

#[tokio::test]
async fn test_unknown_resource_is_not_found() {
    let service = service_with(Settings::default(), &echo_fakes());
    let err = service.read_resource_uri("nginx://secrets").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
}
