//! # Server Mode
//!
//! Serves the MCP protocol over stdio until the client disconnects or the process is
//! asked to stop.

use crate::{config::Settings, mcp_service::NginxMcpService};
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Run in server mode (stdio MCP server).
pub async fn run_server_mode(settings: Arc<Settings>) -> Result<()> {
    info!("Starting nginx_mcp v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Target: {} (service '{}', project {})",
        settings.base_url(),
        settings.service_name,
        settings.project_dir.display()
    );
    info!("Command timeout: {} ms per strategy", settings.timeout_ms);

    let service_handler =
        NginxMcpService::new(settings).context("Failed to create the MCP service")?;
    let service = service_handler
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start the stdio transport")?;
    let cancel = service.cancellation_token();

    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let reason = service.waiting().await?;
    info!("Server stopped: {:?}", reason);
    Ok(())
}

async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = signal::ctrl_c() => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
