//! # Logging Initialization
//!
//! One global `tracing` subscriber, installed at most once per process.
//!
//! - **Filter**: `RUST_LOG` when set, otherwise `<level>,nginx_mcp=debug`.
//! - **File (default)**: daily rolling `nginx_mcp.log` in the user cache directory from
//!   `directories`, without ANSI colors.
//! - **Stderr**: when file logging is off or the cache directory is not writable, with
//!   ANSI colors.
//!
//! Nothing is ever written to stdout: in server mode stdout carries the MCP protocol.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Verbose stderr logging for tests. Safe to call from every test.
pub fn init_test_logging() {
    let _ = init_logging("trace", false);
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},nginx_mcp=debug")))
        };

        if log_to_file && let Some(proj_dirs) = ProjectDirs::from("com", "NginxMcp", "nginx_mcp") {
            let log_dir = proj_dirs.cache_dir();

            // tracing_appender::rolling::daily panics on an unwritable directory.
            if can_write(log_dir) {
                let file_appender = tracing_appender::rolling::daily(log_dir, "nginx_mcp.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                let installed = tracing_subscriber::registry()
                    .with(env_filter())
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .try_init()
                    .is_ok();
                if installed {
                    // Kept alive for the life of the process so buffered lines are flushed.
                    Box::leak(Box::new(guard));
                    return;
                }
            }
        }

        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(layer().with_writer(stderr).with_ansi(true))
            .try_init();
    });

    Ok(())
}

fn can_write(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".nginx_mcp_log_test");
    match std::fs::write(&probe, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
