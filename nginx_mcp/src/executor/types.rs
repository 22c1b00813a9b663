//! Type definitions for the execution engine.
//!
//! Outcomes are only ever built through the constructors on [`ExecutionOutcome`], which
//! act as the result normalizer: every strategy reports through them, so the derived
//! fields (`succeeded`, `timestamp`, the timeout sentinel) cannot drift apart.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    process::ExitStatus,
    time::{Duration, SystemTime},
};

/// Conventional exit code reported when a command exceeds its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Prefix of the stderr text produced when every strategy failed.
pub const CASCADE_EXHAUSTED_PREFIX: &str = "All execution methods failed.";

/// One concrete way of invoking an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Piped child process read incrementally, with an explicit deadline.
    Streaming,
    /// Shell invocation whose output is collected in one piece.
    Buffered,
    /// Blocking spawn-and-wait on the calling thread.
    Synchronous,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Streaming => "streaming",
            StrategyKind::Buffered => "buffered",
            StrategyKind::Synchronous => "synchronous",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a strategy needs to run one command. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Program followed by its arguments, e.g. `["docker", "compose", "ps"]`.
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    /// Variables layered over the inherited process environment.
    pub environment: BTreeMap<String, String>,
}

impl ExecutionRequest {
    pub fn new<I, S>(args: I, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            timeout,
            environment: BTreeMap::new(),
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// The program and arguments split apart, or `None` for an empty vector.
    pub fn program_and_args(&self) -> Option<(&str, &[String])> {
        self.args
            .split_first()
            .map(|(program, rest)| (program.as_str(), rest))
    }

    /// Space-joined command line, for logs and reports.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }

    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

/// Raw result of a single strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub succeeded: bool,
    pub strategy: StrategyKind,
    pub timed_out: bool,
    /// False only when the process could not be started.
    pub launched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(with = "crate::utils::time")]
    pub timestamp: SystemTime,
}

impl ExecutionOutcome {
    /// The process ran to completion with the given exit code.
    pub fn completed(
        strategy: StrategyKind,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            succeeded: exit_code == 0,
            strategy,
            timed_out: false,
            launched: true,
            error_message: None,
            timestamp: SystemTime::now(),
        }
    }

    /// The process could not be launched at all.
    pub fn spawn_failed(strategy: StrategyKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stdout: String::new(),
            stderr: message.clone(),
            exit_code: 1,
            succeeded: false,
            strategy,
            timed_out: false,
            launched: false,
            error_message: Some(message),
            timestamp: SystemTime::now(),
        }
    }

    /// The process outlived its deadline. Whatever stdout was captured is kept, stderr
    /// is replaced with a synthetic message.
    pub fn timed_out(strategy: StrategyKind, stdout: impl Into<String>, timeout: Duration) -> Self {
        let message = format!("Command timed out after {} ms", timeout.as_millis());
        Self {
            stdout: stdout.into(),
            stderr: message.clone(),
            exit_code: TIMEOUT_EXIT_CODE,
            succeeded: false,
            strategy,
            timed_out: true,
            launched: true,
            error_message: Some(message),
            timestamp: SystemTime::now(),
        }
    }

    /// A failure reported by the underlying call rather than by the process exit status.
    pub fn failed(
        strategy: StrategyKind,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let stderr = stderr.into();
        let exit_code = match exit_code {
            Some(0) | None => 1,
            Some(code) => code,
        };
        Self {
            stdout: stdout.into(),
            stderr: if stderr.is_empty() {
                message.clone()
            } else {
                stderr
            },
            exit_code,
            succeeded: false,
            strategy,
            timed_out: false,
            launched: true,
            error_message: Some(message),
            timestamp: SystemTime::now(),
        }
    }

    /// Text recorded in `prior_errors` when a later strategy is tried.
    pub fn failure_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else if let Some(message) = self.error_message.as_deref() {
            message.to_string()
        } else {
            format!("{} strategy exited with code {}", self.strategy, self.exit_code)
        }
    }
}

/// Failure classification used by callers to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The binary could not be launched.
    SpawnError,
    /// The command ran and exited non-zero.
    NonZeroExit,
    /// The command exceeded its timeout.
    Timeout,
    /// Every strategy failed without launching the command.
    CascadeExhausted,
}

/// The engine's caller-facing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeResult {
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
    pub fallback_used: bool,
    pub prior_errors: Vec<String>,
    /// Set only on the synthetic result built after all strategies failed.
    #[serde(default)]
    pub exhausted: bool,
    /// On an exhausted result: how the last attempt that actually launched the command
    /// ended (`NonZeroExit` or `Timeout`). `None` when nothing could be launched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_failure: Option<ErrorKind>,
    /// Exit code of that same attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_exit_code: Option<i32>,
}

impl CascadeResult {
    /// Wraps a successful outcome together with the failures that preceded it.
    pub fn from_outcome(outcome: ExecutionOutcome, prior_errors: Vec<String>) -> Self {
        Self {
            fallback_used: !prior_errors.is_empty(),
            outcome,
            prior_errors,
            exhausted: false,
            command_failure: None,
            command_exit_code: None,
        }
    }

    /// Builds the synthetic result returned once the last strategy has failed too.
    ///
    /// `last_launched` is the most recent attempt that got the command running, if any.
    /// The visible fields stay the same either way; it only feeds [`Self::error_kind`].
    pub fn exhausted(last: &ExecutionOutcome, last_launched: Option<&ExecutionOutcome>) -> Self {
        let last_error = last.failure_text();
        let stderr = format!("{CASCADE_EXHAUSTED_PREFIX} Last error: {last_error}");
        Self {
            outcome: ExecutionOutcome {
                stdout: String::new(),
                stderr: stderr.clone(),
                exit_code: 1,
                succeeded: false,
                strategy: last.strategy,
                timed_out: false,
                launched: last.launched,
                error_message: Some(stderr),
                timestamp: SystemTime::now(),
            },
            fallback_used: false,
            prior_errors: Vec::new(),
            exhausted: true,
            command_failure: last_launched.map(|outcome| {
                if outcome.timed_out {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::NonZeroExit
                }
            }),
            command_exit_code: last_launched.map(|outcome| outcome.exit_code),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded
    }

    pub fn stdout(&self) -> &str {
        &self.outcome.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.outcome.stderr
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code
    }

    pub fn strategy(&self) -> StrategyKind {
        self.outcome.strategy
    }

    pub fn timed_out(&self) -> bool {
        self.outcome.timed_out
    }

    pub fn error_message(&self) -> Option<&str> {
        self.outcome.error_message.as_deref()
    }

    /// Classifies a failed result; `None` on success.
    ///
    /// An exhausted cascade in which the command did run is classified by how that run
    /// ended, so "ran but failed" stays distinct from "could not be run at all".
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.outcome.succeeded {
            None
        } else if self.exhausted {
            Some(self.command_failure.unwrap_or(ErrorKind::CascadeExhausted))
        } else if self.outcome.timed_out {
            Some(ErrorKind::Timeout)
        } else if !self.outcome.launched {
            Some(ErrorKind::SpawnError)
        } else {
            Some(ErrorKind::NonZeroExit)
        }
    }
}

/// Maps a process exit status to an integer code. Signal deaths become `128 + signal`
/// on Unix, matching shell convention.
pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
