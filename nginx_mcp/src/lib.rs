//! # nginx_mcp
//!
//! An MCP server that lets an assistant inspect and control an nginx reverse proxy
//! running under docker compose.
//!
//! - [`executor`]: runs external commands through a three-strategy fallback cascade
//!   (streaming, buffered, synchronous) and always returns a [`executor::CascadeResult`].
//! - [`mcp_service`]: the `rmcp` server handler, tool catalog and resources.
//! - [`config`]: settings loaded once at startup.
//! - [`http_probe`]: HTTP checks against the proxy.
//! - [`report`]: text rendering of results.
//! - [`shell`]: the `nginx_mcp` binary (server mode and one-shot CLI mode).

pub mod config;
pub mod executor;
pub mod http_probe;
pub mod mcp_service;
pub mod report;
pub mod shell;
pub mod utils;
