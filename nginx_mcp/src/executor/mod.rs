//! # Robust Command Execution Engine
//!
//! Runs external commands (in practice `docker compose ...`) from the long-lived
//! server process and always hands back a [`CascadeResult`], never an error.
//!
//! ## Strategies
//!
//! - **Streaming** ([`StreamingStrategy`]): direct spawn, incremental pipe reads,
//!   explicit deadline with SIGTERM on expiry.
//! - **Buffered** ([`BufferedStrategy`]): the same command through `sh -c`, output
//!   collected by `output()` under `tokio::time::timeout`.
//! - **Synchronous** ([`SynchronousStrategy`]): blocking spawn-and-wait with
//!   `wait-timeout`. Blocks the worker, so it only ever runs last.
//!
//! ## Cascade
//!
//! [`RobustExecutor::execute`] tries the strategies strictly in that order and stops at
//! the first success. Each later attempt receives the identical request; a failure only
//! contributes its text to `prior_errors`. When all three fail, a synthetic result
//! whose stderr starts with `"All execution methods failed."` is returned instead of
//! the last raw outcome. It still records how the last launched attempt ended, so a
//! command that ran and exited non-zero is not mistaken for one that could not start.
//! Worst-case latency is three times the configured timeout.
//!
//! Strategies never run concurrently, so two attempts of a lifecycle command (e.g.
//! `stop`) never act on the same compose project at once.

mod buffered;
mod streaming;
mod synchronous;
mod types;

pub use buffered::{BufferedStrategy, escape_shell_argument, run_buffered, shell_command_line};
pub use streaming::{StreamingStrategy, run_streaming};
pub use synchronous::{SynchronousStrategy, run_synchronous};
pub use types::{
    CASCADE_EXHAUSTED_PREFIX, CascadeResult, ErrorKind, ExecutionOutcome, ExecutionRequest,
    StrategyKind, TIMEOUT_EXIT_CODE, exit_code_of,
};

use crate::config::Settings;
use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc, time::Duration};

/// One way of running an [`ExecutionRequest`].
///
/// Implementations must not panic or return early without an outcome: every failure
/// is expressed as a non-successful [`ExecutionOutcome`].
#[async_trait::async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome;
}

/// Engine-wide parameters copied into every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub environment: BTreeMap<String, String>,
}

impl ExecutorConfig {
    pub fn new(working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout,
            environment: BTreeMap::new(),
        }
    }
}

impl From<&Settings> for ExecutorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            working_dir: settings.project_dir.clone(),
            timeout: settings.command_timeout(),
            environment: settings.environment.clone(),
        }
    }
}

/// The cascade controller.
#[derive(Clone)]
pub struct RobustExecutor {
    config: ExecutorConfig,
    streaming: Arc<dyn ExecutionStrategy>,
    buffered: Arc<dyn ExecutionStrategy>,
    synchronous: Arc<dyn ExecutionStrategy>,
}

impl fmt::Debug for RobustExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobustExecutor")
            .field("config", &self.config)
            .field(
                "strategies",
                &[
                    self.streaming.kind(),
                    self.buffered.kind(),
                    self.synchronous.kind(),
                ],
            )
            .finish()
    }
}

impl RobustExecutor {
    /// Creates an executor using the three built-in strategies.
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_strategies(
            config,
            Arc::new(StreamingStrategy),
            Arc::new(BufferedStrategy),
            Arc::new(SynchronousStrategy),
        )
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(ExecutorConfig::from(settings))
    }

    /// Creates an executor with explicit strategies, tried in the given order.
    pub fn with_strategies(
        config: ExecutorConfig,
        streaming: Arc<dyn ExecutionStrategy>,
        buffered: Arc<dyn ExecutionStrategy>,
        synchronous: Arc<dyn ExecutionStrategy>,
    ) -> Self {
        Self {
            config,
            streaming,
            buffered,
            synchronous,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Builds the request every strategy will receive for `args`.
    pub fn request<I, S>(&self, args: I) -> ExecutionRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExecutionRequest::new(args, self.config.working_dir.clone(), self.config.timeout)
            .with_environment(self.config.environment.clone())
    }

    /// Runs `args` (program first) through the cascade.
    pub async fn execute<I, S>(&self, args: I) -> CascadeResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = self.request(args);
        self.execute_request(&request).await
    }

    /// Runs a prepared request through the cascade.
    pub async fn execute_request(&self, request: &ExecutionRequest) -> CascadeResult {
        let command_line = request.command_line();
        let mut prior_errors: Vec<String> = Vec::new();
        let mut last_launched: Option<ExecutionOutcome> = None;

        for strategy in [&self.streaming, &self.buffered] {
            let outcome = attempt(strategy.as_ref(), request, &command_line).await;
            if outcome.succeeded {
                return finish(outcome, prior_errors, &command_line);
            }
            prior_errors.push(outcome.failure_text());
            if outcome.launched {
                last_launched = Some(outcome);
            }
        }

        let outcome = attempt(self.synchronous.as_ref(), request, &command_line).await;
        if outcome.succeeded {
            return finish(outcome, prior_errors, &command_line);
        }
        prior_errors.push(outcome.failure_text());

        tracing::error!(
            "all execution methods failed for '{}': {:?}",
            command_line,
            prior_errors
        );
        let launched = if outcome.launched {
            Some(&outcome)
        } else {
            last_launched.as_ref()
        };
        CascadeResult::exhausted(&outcome, launched)
    }
}

async fn attempt(
    strategy: &dyn ExecutionStrategy,
    request: &ExecutionRequest,
    command_line: &str,
) -> ExecutionOutcome {
    let kind = strategy.kind();
    tracing::debug!("running '{}' with {} strategy", command_line, kind);

    let outcome = strategy.run(request).await;
    if !outcome.succeeded {
        tracing::warn!(
            "{} strategy failed for '{}' (exit {}, timed out: {}): {}",
            kind,
            command_line,
            outcome.exit_code,
            outcome.timed_out,
            outcome.failure_text().trim()
        );
    }
    outcome
}

fn finish(outcome: ExecutionOutcome, prior_errors: Vec<String>, command_line: &str) -> CascadeResult {
    if !prior_errors.is_empty() {
        tracing::info!(
            "'{}' succeeded with {} strategy after {} failed attempt(s)",
            command_line,
            outcome.strategy,
            prior_errors.len()
        );
    }
    CascadeResult::from_outcome(outcome, prior_errors)
}
