//! # Run Modes
//!
//! Contains the operational modes of the nginx_mcp binary.

pub mod cli;
pub mod server;

pub use cli::run_cli_mode;
pub use server::run_server_mode;
