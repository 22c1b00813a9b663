//! Tool catalog and input schema generation.

use super::types::{HealthParams, LogsParams, NoParams, SslInfoParams, SslTemplateParams};
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use std::sync::Arc;

/// Input schema for a parameter struct, as the JSON object MCP expects.
pub fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    let mut object = schema.as_object().cloned().unwrap_or_default();
    object.remove("$schema");
    object
        .entry("type")
        .or_insert_with(|| serde_json::Value::String("object".to_string()));
    object
        .entry("properties")
        .or_insert_with(|| serde_json::Value::Object(Default::default()));
    Arc::new(object)
}

fn tool(name: &'static str, title: &str, description: &str, input_schema: Arc<JsonObject>) -> Tool {
    Tool {
        name: name.into(),
        title: Some(title.to_string()),
        icons: None,
        description: Some(description.to_string().into()),
        input_schema,
        output_schema: None,
        annotations: None,
        meta: None,
    }
}

/// Names of every tool, in catalog order.
pub const TOOL_NAMES: &[&str] = &[
    "nginx_status",
    "nginx_health",
    "nginx_container_status",
    "nginx_logs",
    "nginx_config_test",
    "nginx_config_show",
    "nginx_reload",
    "nginx_restart",
    "nginx_start",
    "nginx_stop",
    "nginx_ssl_info",
    "nginx_ssl_template",
    "compose_version",
];

/// The fixed tool catalog.
pub fn tool_catalog() -> Vec<Tool> {
    let none = input_schema::<NoParams>;
    vec![
        tool(
            "nginx_status",
            "Proxy status",
            "Fetch the nginx stub_status page (active connections, accepts, handled, requests).",
            none(),
        ),
        tool(
            "nginx_health",
            "Proxy health check",
            "Send an HTTP GET to the proxy and report the status code and latency.",
            input_schema::<HealthParams>(),
        ),
        tool(
            "nginx_container_status",
            "Container status",
            "Show the compose status of the nginx container.",
            none(),
        ),
        tool(
            "nginx_logs",
            "Container logs",
            "Return the most recent log lines of the nginx container.",
            input_schema::<LogsParams>(),
        ),
        tool(
            "nginx_config_test",
            "Test configuration",
            "Run `nginx -t` inside the container to validate the configuration.",
            none(),
        ),
        tool(
            "nginx_config_show",
            "Show configuration",
            "Dump the full effective configuration with `nginx -T`.",
            none(),
        ),
        tool(
            "nginx_reload",
            "Reload configuration",
            "Reload nginx in place (`nginx -s reload`). Run nginx_config_test first.",
            none(),
        ),
        tool(
            "nginx_restart",
            "Restart container",
            "Restart the nginx container through docker compose.",
            none(),
        ),
        tool(
            "nginx_start",
            "Start container",
            "Start the nginx container in the background (`compose up -d`).",
            none(),
        ),
        tool(
            "nginx_stop",
            "Stop container",
            "Stop the nginx container.",
            none(),
        ),
        tool(
            "nginx_ssl_info",
            "Certificate info",
            "Show subject, issuer and validity dates of a certificate in the SSL directory.",
            input_schema::<SslInfoParams>(),
        ),
        tool(
            "nginx_ssl_template",
            "HTTPS server block",
            "Render an HTTPS server block (plus HTTP redirect) for a domain. Nothing is written.",
            input_schema::<SslTemplateParams>(),
        ),
        tool(
            "compose_version",
            "Compose version",
            "Report the docker compose version, useful to check the toolchain is reachable.",
            none(),
        ),
    ]
}
