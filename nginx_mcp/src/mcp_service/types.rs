//! Tool parameter types and the error type of the tool layer.

use rmcp::model::ErrorData as McpError;
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LOG_LINES: u32 = 50;
pub const MAX_LOG_LINES: u32 = 5000;
pub const DEFAULT_CERT_NAME: &str = "server.crt";
pub const DEFAULT_UPSTREAM: &str = "http://backend:8080";

/// Tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct HealthParams {
    /// Path to request, e.g. `/healthz`. Defaults to `/`.
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LogsParams {
    /// Number of trailing lines to return (1-5000, default 50).
    pub lines: Option<u32>,
    /// Only show lines newer than this, e.g. `10m` or an RFC 3339 timestamp.
    pub since: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SslInfoParams {
    /// Certificate file name inside the SSL directory. Defaults to `server.crt`.
    pub cert_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SslTemplateParams {
    /// Domain the server block answers for.
    pub domain: String,
    /// Upstream URL requests are proxied to. Defaults to `http://backend:8080`.
    pub upstream: Option<String>,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for '{param}': {reason}")]
    InvalidValue { param: &'static str, reason: String },
}

impl From<ToolError> for McpError {
    fn from(error: ToolError) -> Self {
        let data = match &error {
            ToolError::UnknownTool(name) => Some(serde_json::json!({ "tool_name": name })),
            ToolError::InvalidArguments { tool, .. } => {
                Some(serde_json::json!({ "tool_name": tool }))
            }
            ToolError::InvalidValue { param, .. } => Some(serde_json::json!({ "param": param })),
        };
        McpError::invalid_params(error.to_string(), data)
    }
}

/// Rejects values that would escape a directory or split into several arguments.
pub fn validate_plain_name(param: &'static str, value: &str) -> Result<(), ToolError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else if value == "." || value == ".." {
        Some("must not be a relative directory")
    } else if value.starts_with('-') {
        Some("must not start with '-'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ToolError::InvalidValue {
            param,
            reason: format!("'{value}' {reason}"),
        }),
        None => Ok(()),
    }
}
