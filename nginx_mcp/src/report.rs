//! Plain-text reports handed back to the MCP client (and printed in CLI mode).

use crate::executor::{CascadeResult, ErrorKind};
use crate::http_probe::{ProbeError, ProbeResponse};
use std::fmt::Write;

/// Short explanation of a failure class.
pub fn describe_error_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NonZeroExit => "command ran but reported an error",
        ErrorKind::Timeout => "command timed out",
        ErrorKind::SpawnError => "command could not be started",
        ErrorKind::CascadeExhausted => "command could not be run at all",
    }
}

/// Renders a command result. `hint` is appended to failures only.
pub fn render_command(title: &str, command_line: &str, result: &CascadeResult, hint: Option<&str>) -> String {
    let mut out = String::new();
    let status = if result.succeeded() { "OK" } else { "FAIL" };
    let _ = writeln!(out, "{status} {title}");
    let _ = writeln!(out, "Command: {command_line}");
    let _ = writeln!(
        out,
        "Strategy: {}{}",
        result.strategy(),
        if result.fallback_used { " (fallback)" } else { "" }
    );
    let _ = writeln!(out, "Exit code: {}", result.exit_code());
    if let Some(code) = result.command_exit_code {
        let _ = writeln!(out, "Command exit code: {code}");
    }
    if result.timed_out() {
        let _ = writeln!(out, "Timed out: yes");
    }

    section(&mut out, "stdout", result.stdout());
    section(&mut out, "stderr", result.stderr());

    if !result.prior_errors.is_empty() {
        let _ = writeln!(out, "\n--- earlier attempts ---");
        for (i, error) in result.prior_errors.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, error.trim());
        }
    }

    if let Some(kind) = result.error_kind() {
        let _ = writeln!(out, "\nResult: {}", describe_error_kind(kind));
        if let Some(hint) = hint {
            let _ = writeln!(out, "Hint: {hint}");
        }
    }
    out
}

/// Renders the outcome of an HTTP probe.
pub fn render_probe(title: &str, result: &Result<ProbeResponse, ProbeError>) -> String {
    let mut out = String::new();
    match result {
        Ok(response) => {
            let status = if response.is_success() { "OK" } else { "FAIL" };
            let _ = writeln!(out, "{status} {title}");
            let _ = writeln!(out, "URL: {}", response.url);
            let _ = writeln!(out, "HTTP status: {}", response.status);
            let _ = writeln!(out, "Latency: {} ms", response.elapsed.as_millis());
            section(&mut out, "body", &response.body);
        }
        Err(e) => {
            let _ = writeln!(out, "FAIL {title}");
            let _ = writeln!(out, "Error: {e}");
            let _ = writeln!(
                out,
                "Hint: check that the proxy is running and reachable at the configured host and port"
            );
        }
    }
    out
}

fn section(out: &mut String, name: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    let _ = writeln!(out, "\n--- {name} ---");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
}
