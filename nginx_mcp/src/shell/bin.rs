// Binary entry point for nginx_mcp
// This is a thin wrapper that delegates to the library implementation

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    match nginx_mcp::shell::run().await {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("nginx_mcp fatal error: {:#}", e);
            Err(e)
        }
    }
}
