//! # Streaming Strategy
//!
//! Spawns the program directly with piped stdout/stderr and reads both pipes
//! incrementally inside a single `select!` loop. The deadline lives in the same loop,
//! so the timer is scoped to this call: it is dropped on every exit path and can never
//! fire after the outcome has been produced.
//!
//! On timeout the child receives SIGTERM and the outcome is returned immediately,
//! without waiting for the process to actually exit.

use super::types::{ExecutionOutcome, ExecutionRequest, StrategyKind, exit_code_of};
use super::ExecutionStrategy;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep_until};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingStrategy;

#[async_trait::async_trait]
impl ExecutionStrategy for StreamingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Streaming
    }

    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        run_streaming(request).await
    }
}

/// Runs the request with incremental pipe reads and an explicit deadline.
pub async fn run_streaming(request: &ExecutionRequest) -> ExecutionOutcome {
    let kind = StrategyKind::Streaming;
    let Some((program, args)) = request.program_and_args() else {
        return ExecutionOutcome::spawn_failed(kind, "Empty argument vector");
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&request.working_dir)
        .envs(&request.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("streaming spawn of '{}' failed: {}", program, e);
            return ExecutionOutcome::spawn_failed(kind, format!("Failed to spawn '{program}': {e}"));
        }
    };

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        terminate(&mut child);
        return ExecutionOutcome::spawn_failed(kind, "Child process pipes were not captured");
    };

    let deadline = Instant::now() + request.timeout;
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout_chunk = [0u8; READ_CHUNK];
    let mut stderr_chunk = [0u8; READ_CHUNK];
    let mut stdout_open = true;
    let mut stderr_open = true;

    let status = loop {
        tokio::select! {
            biased;

            _ = sleep_until(deadline) => {
                tracing::warn!(
                    "'{}' timed out after {} ms, sending termination signal",
                    request.command_line(),
                    request.timeout_ms()
                );
                terminate(&mut child);
                return ExecutionOutcome::timed_out(
                    kind,
                    String::from_utf8_lossy(&stdout_buf),
                    request.timeout,
                );
            }

            read = stderr.read(&mut stderr_chunk), if stderr_open => match read {
                Ok(0) => stderr_open = false,
                Ok(n) => stderr_buf.extend_from_slice(&stderr_chunk[..n]),
                Err(e) => {
                    tracing::warn!("error reading stderr of '{}': {}", program, e);
                    stderr_open = false;
                }
            },

            read = stdout.read(&mut stdout_chunk), if stdout_open => match read {
                Ok(0) => stdout_open = false,
                Ok(n) => stdout_buf.extend_from_slice(&stdout_chunk[..n]),
                Err(e) => {
                    tracing::warn!("error reading stdout of '{}': {}", program, e);
                    stdout_open = false;
                }
            },

            status = child.wait(), if !stdout_open && !stderr_open => break status,
        }
    };

    let stdout_text = String::from_utf8_lossy(&stdout_buf).into_owned();
    let stderr_text = String::from_utf8_lossy(&stderr_buf).into_owned();

    match status {
        Ok(status) => {
            ExecutionOutcome::completed(kind, stdout_text, stderr_text, exit_code_of(&status))
        }
        Err(e) => ExecutionOutcome::failed(
            kind,
            stdout_text,
            stderr_text,
            None,
            format!("Failed to wait for '{program}': {e}"),
        ),
    }
}

/// Asks the child to stop. Graceful on Unix; the result is not awaited.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::debug!("SIGTERM to pid {} failed: {}", pid, e);
            }
            return;
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!("start_kill failed: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(args: &[&str], timeout_ms: u64) -> ExecutionRequest {
        ExecutionRequest::new(
            args.iter().copied(),
            std::env::temp_dir(),
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let outcome = run_streaming(&request(&["echo", "hello"], 5_000)).await;
        assert!(outcome.succeeded, "{outcome:?}");
        assert_eq!(outcome.stdout.trim(), "hello");
        assert_eq!(outcome.strategy, StrategyKind::Streaming);
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn reports_non_zero_exit_with_stderr() {
        let outcome =
            run_streaming(&request(&["sh", "-c", "echo broken >&2; exit 3"], 5_000)).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr.trim(), "broken");
        assert!(outcome.launched);
    }

    #[tokio::test]
    async fn spawn_failure_is_an_outcome() {
        let outcome = run_streaming(&request(&["nonexistent-binary-xyz"], 5_000)).await;
        assert!(!outcome.succeeded);
        assert!(!outcome.launched);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stdout.is_empty());
        assert!(outcome.error_message.is_some());
    }

    #[tokio::test]
    async fn empty_argument_vector_is_a_spawn_failure() {
        let outcome = run_streaming(&request(&[], 5_000)).await;
        assert!(!outcome.launched);
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn passes_environment_overlay() {
        let mut req = request(&["sh", "-c", "printf %s \"$NGINX_MCP_OVERLAY\""], 5_000);
        req.environment
            .insert("NGINX_MCP_OVERLAY".to_string(), "overlay".to_string());
        let outcome = run_streaming(&req).await;
        assert_eq!(outcome.stdout, "overlay");
    }
}
