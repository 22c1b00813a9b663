//! # Synchronous Strategy
//!
//! Last resort: a plain `std::process::Command` waited on with `wait-timeout`. The
//! calling worker is blocked for the whole run. Pipes are drained on helper threads so
//! a chatty child cannot fill its pipe buffer and stall the wait.
//!
//! One deadline covers both the wait and the pipe drain. A background process that
//! inherited the pipes can keep them open after the child exits; the run still ends at
//! the deadline, as a timeout carrying the stdout read so far.

use super::ExecutionStrategy;
use super::types::{ExecutionOutcome, ExecutionRequest, StrategyKind, exit_code_of};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tokio::runtime::{Handle, RuntimeFlavor};
use wait_timeout::ChildExt;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct SynchronousStrategy;

#[async_trait::async_trait]
impl ExecutionStrategy for SynchronousStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Synchronous
    }

    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        // On a multi-thread runtime the worker is handed over so other tasks move
        // elsewhere; a current-thread runtime simply stalls until the command ends.
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| run_synchronous(request))
            }
            _ => run_synchronous(request),
        }
    }
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Copies `pipe` into a shared buffer on a helper thread and signals `done` at EOF.
fn drain<R: Read + Send + 'static>(pipe: Option<R>, done: Sender<()>) -> SharedBuffer {
    let buffer = SharedBuffer::default();
    let Some(mut reader) = pipe else {
        let _ = done.send(());
        return buffer;
    };
    let sink = Arc::clone(&buffer);
    thread::spawn(move || {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
            }
        }
        let _ = done.send(());
    });
    buffer
}

/// Waits until `pending` readers have reached EOF. False if `deadline` passes first.
fn pipes_closed(done: &Receiver<()>, mut pending: usize, deadline: Instant) -> bool {
    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if done.recv_timeout(remaining).is_err() {
            return false;
        }
        pending -= 1;
    }
    true
}

fn snapshot(buffer: &SharedBuffer) -> String {
    buffer
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Runs the request to completion on the current thread.
pub fn run_synchronous(request: &ExecutionRequest) -> ExecutionOutcome {
    let kind = StrategyKind::Synchronous;
    let Some((program, args)) = request.program_and_args() else {
        return ExecutionOutcome::spawn_failed(kind, "Empty argument vector");
    };

    let mut child = match Command::new(program)
        .args(args)
        .current_dir(&request.working_dir)
        .envs(&request.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ExecutionOutcome::spawn_failed(kind, format!("Failed to spawn '{program}': {e}"));
        }
    };

    let deadline = Instant::now() + request.timeout;
    let (done_tx, done_rx) = mpsc::channel();
    let stdout_buf = drain(child.stdout.take(), done_tx.clone());
    let stderr_buf = drain(child.stderr.take(), done_tx);

    match child.wait_timeout(request.timeout) {
        Ok(Some(status)) => {
            if !pipes_closed(&done_rx, 2, deadline) {
                tracing::warn!(
                    "'{}' exited but its output pipes stayed open past {} ms",
                    request.command_line(),
                    request.timeout_ms()
                );
                return ExecutionOutcome::timed_out(kind, snapshot(&stdout_buf), request.timeout);
            }
            let stdout = snapshot(&stdout_buf);
            let stderr = snapshot(&stderr_buf);
            if status.success() {
                ExecutionOutcome::completed(kind, stdout, String::new(), 0)
            } else {
                ExecutionOutcome::failed(
                    kind,
                    stdout,
                    stderr,
                    Some(exit_code_of(&status)),
                    format!("Command failed: {}", request.command_line()),
                )
            }
        }
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // Reader threads are left to finish on their own: a grandchild may still
            // hold the pipes open.
            ExecutionOutcome::timed_out(kind, snapshot(&stdout_buf), request.timeout)
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            ExecutionOutcome::failed(
                kind,
                snapshot(&stdout_buf),
                snapshot(&stderr_buf),
                None,
                format!("Failed to wait for '{program}': {e}"),
            )
        }
    }
}
