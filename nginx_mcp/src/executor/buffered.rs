//! # Buffered Strategy
//!
//! Hands the whole command line to the platform shell and collects stdout and stderr
//! into buffers, with the whole run bounded by `tokio::time::timeout`. It exists next to
//! the streaming strategy because some hosts refuse direct pipe handling for a spawned
//! binary while a plain shell invocation still works.
//!
//! The buffers live outside the timed future, so a timeout still reports whatever
//! stdout had arrived.

use super::ExecutionStrategy;
use super::types::{ExecutionOutcome, ExecutionRequest, StrategyKind, exit_code_of};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct BufferedStrategy;

#[async_trait::async_trait]
impl ExecutionStrategy for BufferedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Buffered
    }

    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        run_buffered(request).await
    }
}

/// Quotes a single argument for a POSIX shell.
pub fn escape_shell_argument(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// Joins an argument vector into one shell command line.
pub fn shell_command_line(args: &[String]) -> String {
    args.iter()
        .map(|arg| escape_shell_argument(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(line);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.arg("-c").arg(line);
        command
    }
}

/// Appends everything `pipe` yields to `buf`. Each chunk lands in `buf` as soon as it
/// is read, so cancelling this future loses nothing already received.
async fn read_into<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) {
    let Some(mut pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::debug!("buffered pipe read failed: {}", e);
                return;
            }
        }
    }
}

/// Runs the request through the shell and buffers all output.
pub async fn run_buffered(request: &ExecutionRequest) -> ExecutionOutcome {
    let kind = StrategyKind::Buffered;
    if request.args.is_empty() {
        return ExecutionOutcome::spawn_failed(kind, "Empty argument vector");
    }

    let line = shell_command_line(&request.args);
    let mut command = shell_command(&line);
    command
        .current_dir(&request.working_dir)
        .envs(&request.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionOutcome::spawn_failed(
                kind,
                format!("Failed to run shell for '{line}': {e}"),
            );
        }
    };

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let finished = tokio::time::timeout(request.timeout, async {
        tokio::join!(
            read_into(stdout_pipe, &mut stdout_buf),
            read_into(stderr_pipe, &mut stderr_buf)
        );
        child.wait().await
    })
    .await;

    let stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
    let status = match finished {
        Err(_) => {
            tracing::warn!(
                "buffered run of '{}' exceeded {} ms",
                line,
                request.timeout_ms()
            );
            if let Err(e) = child.start_kill() {
                tracing::debug!("start_kill failed: {}", e);
            }
            return ExecutionOutcome::timed_out(kind, stdout, request.timeout);
        }
        Ok(Err(e)) => {
            return ExecutionOutcome::failed(
                kind,
                stdout,
                String::from_utf8_lossy(&stderr_buf),
                None,
                format!("Failed to wait for shell running '{line}': {e}"),
            );
        }
        Ok(Ok(status)) => status,
    };

    let stderr = String::from_utf8_lossy(&stderr_buf).into_owned();
    if status.success() {
        ExecutionOutcome::completed(kind, stdout, stderr, 0)
    } else {
        ExecutionOutcome::failed(
            kind,
            stdout,
            stderr,
            Some(exit_code_of(&status)),
            format!("Command failed: {line}"),
        )
    }
}
