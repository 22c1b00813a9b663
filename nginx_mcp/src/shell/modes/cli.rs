//! # CLI Mode
//!
//! Runs a single tool through the same dispatch path as the server and prints the
//! report to stdout.

use crate::{config::Settings, mcp_service::NginxMcpService};
use anyhow::{Context, Result, anyhow};
use rmcp::model::{CallToolResult, JsonObject};
use std::{process::ExitCode, sync::Arc};

/// Text content of a tool result, joined by newlines.
pub fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run in CLI mode. The exit code is non-zero when the tool reported an error.
pub async fn run_cli_mode(
    settings: Arc<Settings>,
    tool_name: &str,
    arguments: JsonObject,
) -> Result<ExitCode> {
    let service = NginxMcpService::new(settings).context("Failed to create the MCP service")?;

    let result = service
        .dispatch_tool(tool_name, Some(arguments))
        .await
        .map_err(|e| anyhow!("{}", e.message))?;

    print!("{}", result_text(&result));
    if result.is_error == Some(true) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
