//! Tool handlers.
//!
//! Every tool is first turned into a [`ToolAction`] by [`plan_tool`], a pure function of
//! the tool name, its arguments and the settings. Running the action is the only part
//! that touches processes or the network.

use super::types::{
    DEFAULT_CERT_NAME, DEFAULT_LOG_LINES, DEFAULT_UPSTREAM, HealthParams, LogsParams,
    MAX_LOG_LINES, NoParams, SslInfoParams, SslTemplateParams, ToolError, validate_plain_name,
};
use crate::config::Settings;
use rmcp::model::JsonObject;
use serde::de::DeserializeOwned;

/// What a tool call resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// HTTP GET against the proxy.
    Probe { title: &'static str, path: String },
    /// External command run through the execution engine.
    Command {
        title: &'static str,
        args: Vec<String>,
        hint: &'static str,
    },
    /// Text produced without running anything.
    Text(String),
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Option<JsonObject>) -> Result<T, ToolError> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn exec_in_service(settings: &Settings, command: &[&str]) -> Vec<String> {
    let mut args = vec!["exec", "-T", settings.service_name.as_str()];
    args.extend_from_slice(command);
    settings.compose_args(args)
}

const CONTAINER_HINT: &str =
    "check that docker is running, the compose project directory is correct and the service is up";

/// Resolves a tool call into the action that implements it.
pub fn plan_tool(
    name: &str,
    arguments: Option<JsonObject>,
    settings: &Settings,
) -> Result<ToolAction, ToolError> {
    let service = settings.service_name.as_str();
    let action = match name {
        "nginx_status" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Probe {
                title: "Proxy status",
                path: settings.status_path.clone(),
            }
        }
        "nginx_health" => {
            let params: HealthParams = parse(name, arguments)?;
            let path = params.path.unwrap_or_else(|| "/".to_string());
            if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
                return Err(ToolError::InvalidValue {
                    param: "path",
                    reason: format!("'{path}' must start with '/' and contain no whitespace"),
                });
            }
            ToolAction::Probe {
                title: "Proxy health",
                path,
            }
        }
        "nginx_container_status" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Container status",
                args: settings.compose_args(["ps", service]),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_logs" => {
            let params: LogsParams = parse(name, arguments)?;
            let lines = params.lines.unwrap_or(DEFAULT_LOG_LINES);
            if !(1..=MAX_LOG_LINES).contains(&lines) {
                return Err(ToolError::InvalidValue {
                    param: "lines",
                    reason: format!("{lines} is outside 1..={MAX_LOG_LINES}"),
                });
            }
            let mut args = vec!["logs".to_string(), "--tail".to_string(), lines.to_string()];
            if let Some(since) = params.since.filter(|s| !s.trim().is_empty()) {
                if since.starts_with('-') || since.chars().any(char::is_whitespace) {
                    return Err(ToolError::InvalidValue {
                        param: "since",
                        reason: format!("'{since}' is not a duration or timestamp"),
                    });
                }
                args.push("--since".to_string());
                args.push(since);
            }
            args.push(service.to_string());
            ToolAction::Command {
                title: "Container logs",
                args: settings.compose_args(args),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_config_test" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Configuration test",
                args: exec_in_service(settings, &["nginx", "-t"]),
                hint: "fix the reported configuration error before reloading",
            }
        }
        "nginx_config_show" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Effective configuration",
                args: exec_in_service(settings, &["nginx", "-T"]),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_reload" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Reload",
                args: exec_in_service(settings, &["nginx", "-s", "reload"]),
                hint: "run nginx_config_test to find configuration errors",
            }
        }
        "nginx_restart" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Restart",
                args: settings.compose_args(["restart", service]),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_start" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Start",
                args: settings.compose_args(["up", "-d", service]),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_stop" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Stop",
                args: settings.compose_args(["stop", service]),
                hint: CONTAINER_HINT,
            }
        }
        "nginx_ssl_info" => {
            let params: SslInfoParams = parse(name, arguments)?;
            let cert = params
                .cert_name
                .unwrap_or_else(|| DEFAULT_CERT_NAME.to_string());
            validate_plain_name("cert_name", &cert)?;
            let cert_path = format!("{}/{}", settings.ssl_dir.trim_end_matches('/'), cert);
            ToolAction::Command {
                title: "Certificate info",
                args: exec_in_service(
                    settings,
                    &[
                        "openssl", "x509", "-in", cert_path.as_str(), "-noout", "-subject", "-issuer",
                        "-dates",
                    ],
                ),
                hint: "check that the certificate exists in the SSL directory",
            }
        }
        "nginx_ssl_template" => {
            let params: SslTemplateParams = parse(name, arguments)?;
            validate_plain_name("domain", &params.domain)?;
            let upstream = params
                .upstream
                .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string());
            if upstream.is_empty()
                || upstream
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}'))
            {
                return Err(ToolError::InvalidValue {
                    param: "upstream",
                    reason: format!("'{upstream}' is not a usable upstream URL"),
                });
            }
            ToolAction::Text(ssl_server_block(&params.domain, &upstream, &settings.ssl_dir))
        }
        "compose_version" => {
            parse::<NoParams>(name, arguments)?;
            ToolAction::Command {
                title: "Compose version",
                args: settings.compose_args(["version"]),
                hint: "check that docker and the compose plugin are installed",
            }
        }
        other => return Err(ToolError::UnknownTool(other.to_string())),
    };
    Ok(action)
}

/// HTTPS server block for `domain`, plus a port 80 redirect.
pub fn ssl_server_block(domain: &str, upstream: &str, ssl_dir: &str) -> String {
    let ssl_dir = ssl_dir.trim_end_matches('/');
    format!(
        r#"server {{
    listen 443 ssl;
    http2 on;
    server_name {domain};

    ssl_certificate {ssl_dir}/{domain}.crt;
    ssl_certificate_key {ssl_dir}/{domain}.key;
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_prefer_server_ciphers on;
    ssl_session_cache shared:SSL:10m;
    ssl_session_timeout 10m;

    location / {{
        proxy_pass {upstream};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
}}

server {{
    listen 80;
    server_name {domain};
    return 301 https://$host$request_uri;
}}
"#
    )
}
