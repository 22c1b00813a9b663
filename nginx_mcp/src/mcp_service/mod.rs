//! # nginx MCP Service
//!
//! `NginxMcpService` implements `rmcp::ServerHandler`. It owns the shared settings, the
//! command engine and the HTTP probe, and turns tool calls into reports.
//!
//! ## Error surface
//!
//! A command that fails (non-zero exit, timeout, spawn failure, exhausted cascade) is
//! still a successful MCP call: the client receives a `CallToolResult` with `is_error`
//! set and the text report. Only unknown tools, bad arguments and unknown resource URIs
//! are protocol errors.

mod handlers;
mod resources;
mod schema;
mod types;

pub use handlers::{ToolAction, plan_tool, ssl_server_block};
pub use resources::{CONFIG_URI, SETTINGS_URI, list_resources};
pub use schema::{TOOL_NAMES, input_schema, tool_catalog};
pub use types::{
    HealthParams, LogsParams, NoParams, SslInfoParams, SslTemplateParams, ToolError,
    validate_plain_name,
};

use crate::{
    config::Settings,
    executor::RobustExecutor,
    http_probe::{HttpProbe, ProbeError},
    report,
};
use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ErrorData as McpError, Implementation,
        JsonObject, ListResourcesResult, ListToolsResult, PaginatedRequestParams,
        ProtocolVersion, ReadResourceRequestParams, ReadResourceResult, ResourceContents,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NginxMcpService {
    settings: Arc<Settings>,
    executor: Arc<RobustExecutor>,
    probe: HttpProbe,
}

impl NginxMcpService {
    /// Creates a service with the built-in execution strategies.
    pub fn new(settings: Arc<Settings>) -> Result<Self, ProbeError> {
        let executor = Arc::new(RobustExecutor::from_settings(&settings));
        Self::with_executor(settings, executor)
    }

    /// Creates a service around an existing executor.
    pub fn with_executor(
        settings: Arc<Settings>,
        executor: Arc<RobustExecutor>,
    ) -> Result<Self, ProbeError> {
        let probe = HttpProbe::new(settings.base_url(), settings.http_timeout())?;
        Ok(Self {
            settings,
            executor,
            probe,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs one tool by name. Shared by `call_tool` and CLI mode.
    pub async fn dispatch_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let action = plan_tool(name, arguments, &self.settings).map_err(|e| {
            tracing::warn!("rejected call to '{}': {}", name, e);
            McpError::from(e)
        })?;
        tracing::info!("running tool '{}'", name);
        Ok(self.run_action(action).await)
    }

    /// Executes a planned action and wraps the report.
    pub async fn run_action(&self, action: ToolAction) -> CallToolResult {
        match action {
            ToolAction::Probe { title, path } => {
                let result = self.probe.get(&path).await;
                let ok = matches!(&result, Ok(response) if response.is_success());
                let text = report::render_probe(title, &result);
                if ok {
                    CallToolResult::success(vec![Content::text(text)])
                } else {
                    CallToolResult::error(vec![Content::text(text)])
                }
            }
            ToolAction::Command { title, args, hint } => {
                let command_line = args.join(" ");
                let result = self.executor.execute(args).await;
                let text = report::render_command(title, &command_line, &result, Some(hint));
                if result.succeeded() {
                    CallToolResult::success(vec![Content::text(text)])
                } else {
                    CallToolResult::error(vec![Content::text(text)])
                }
            }
            ToolAction::Text(text) => CallToolResult::success(vec![Content::text(text)]),
        }
    }

    /// Reads one of the resources listed by [`list_resources`].
    pub async fn read_resource_uri(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let text = match uri {
            SETTINGS_URI => serde_json::to_string_pretty(self.settings.as_ref())
                .map_err(|e| McpError::internal_error(e.to_string(), None))?,
            CONFIG_URI => {
                let ToolAction::Command { title, args, hint } =
                    plan_tool("nginx_config_show", None, &self.settings)?
                else {
                    return Err(McpError::internal_error(
                        "nginx_config_show did not resolve to a command",
                        None,
                    ));
                };
                let command_line = args.join(" ");
                let result = self.executor.execute(args).await;
                if result.succeeded() {
                    result.stdout().to_string()
                } else {
                    report::render_command(title, &command_line, &result, Some(hint))
                }
            }
            other => {
                return Err(McpError::resource_not_found(
                    format!("Resource '{other}' not found"),
                    Some(serde_json::json!({ "uri": other })),
                ));
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

#[allow(clippy::manual_async_fn)]
impl ServerHandler for NginxMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("nginx reverse proxy".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "Controls the nginx service '{}' of the compose project in {}. \
                 Run nginx_config_test before nginx_reload.",
                self.settings.service_name,
                self.settings.project_dir.display()
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(tool_catalog())))
    }

    fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            self.dispatch_tool(params.name.as_ref(), params.arguments)
                .await
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(list_resources()))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move { self.read_resource_uri(&request.uri).await }
    }
}
