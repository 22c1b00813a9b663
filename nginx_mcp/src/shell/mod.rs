//! # Shell Module
//!
//! Entry point and CLI logic for the `nginx_mcp` binary: argument parsing, settings
//! assembly and the two run modes (stdio server, single tool).

pub mod cli;
pub mod modes;

pub use cli::{Cli, parse_tool_args, run};
