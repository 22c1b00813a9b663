//! # nginx_mcp CLI
//!
//! Command-line interface definition and main entry point.

use super::modes;
use crate::{config::Settings, utils::logging::init_logging};
use anyhow::{Context, Result, bail};
use clap::Parser;
use rmcp::model::JsonObject;
use serde_json::Value;
use std::{io::IsTerminal, path::PathBuf, process::ExitCode, sync::Arc};

/// nginx_mcp: MCP server for an nginx reverse proxy managed by docker compose.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about,
    long_about = "nginx_mcp runs in two modes:

1. STDIO Mode (default): MCP server over stdio for an MCP client.
   Example: nginx_mcp --project-dir /srv/proxy

2. CLI Mode: run a single tool and print its report to stdout.
   Example: nginx_mcp nginx_logs --arg lines=100 --arg since=10m"
)]
pub struct Cli {
    /// Path to a TOML settings file (default: ./nginx_mcp.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host the proxy serves HTTP on
    #[arg(long)]
    pub host: Option<String>,

    /// Port the proxy serves HTTP on
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory of the docker compose project
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Compose service name of the proxy
    #[arg(long)]
    pub service: Option<String>,

    /// Timeout for each execution strategy, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log to stderr instead of file
    #[arg(long)]
    pub log_to_stderr: bool,

    /// Tool name (for CLI mode)
    #[arg(value_name = "TOOL")]
    pub tool_name: Option<String>,

    /// Tool argument as key=value (for CLI mode, repeatable)
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    pub tool_args: Vec<String>,
}

impl Cli {
    /// Applies command-line flags, the highest precedence layer.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = &self.project_dir {
            settings.project_dir = dir.clone();
        }
        if let Some(service) = &self.service {
            settings.service_name = service.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
    }

    /// Builds the final settings from file, environment and flags.
    pub async fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())
            .await
            .context("Failed to load settings")?;
        self.apply_overrides(&mut settings);
        settings.validate().context("Invalid command-line settings")?;
        Ok(settings)
    }
}

/// Parses `key=value` pairs into tool arguments. Values that parse as JSON (numbers,
/// booleans) keep their type; everything else is a string.
pub fn parse_tool_args(pairs: &[String]) -> Result<JsonObject> {
    let mut arguments = JsonObject::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Tool argument '{}' must have the form key=value", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Tool argument '{}' has an empty key", pair);
        }
        let value = match serde_json::from_str::<Value>(value) {
            Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
            _ => Value::String(value.to_string()),
        };
        arguments.insert(key.to_string(), value);
    }
    Ok(arguments)
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, !cli.log_to_stderr)?;

    let settings = Arc::new(cli.load_settings().await?);
    tracing::debug!("Active settings: {:?}", settings);

    match cli.tool_name.as_deref() {
        None => {
            if std::io::stdin().is_terminal() {
                eprintln!(
                    "\nFAIL Error: nginx_mcp is an MCP server designed for JSON-RPC communication over stdio.\n"
                );
                eprintln!("It cannot be run directly from an interactive terminal.\n");
                eprintln!("Usage options:");
                eprintln!("  1. Run as stdio MCP server (requires MCP client):");
                eprintln!("     nginx_mcp --project-dir /path/to/compose/project\n");
                eprintln!("  2. Run a single tool:");
                eprintln!("     nginx_mcp <tool_name> [--arg key=value ...]\n");
                eprintln!("For more information, run: nginx_mcp --help\n");
                return Ok(ExitCode::FAILURE);
            }
            tracing::info!("Running in STDIO server mode");
            modes::run_server_mode(settings).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(tool) => {
            tracing::info!("Running in CLI mode");
            let arguments = parse_tool_args(&cli.tool_args)?;
            modes::run_cli_mode(settings, tool, arguments).await
        }
    }
}
