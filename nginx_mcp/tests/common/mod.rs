//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod http;

use nginx_mcp::executor::{
    ExecutionOutcome, ExecutionRequest, ExecutionStrategy, ExecutorConfig, RobustExecutor,
    StrategyKind,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

/// What a [`FakeStrategy`] does when run.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(&'static str),
    /// Exits with the given code and stderr.
    Fail(i32, &'static str),
    SpawnFail(&'static str),
    Timeout,
    /// Succeeds with the argument vector joined by spaces as stdout.
    EchoArgs,
}

/// Strategy double that counts calls and records every request it receives.
pub struct FakeStrategy {
    kind: StrategyKind,
    behavior: Behavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl FakeStrategy {
    pub fn new(kind: StrategyKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ExecutionStrategy for FakeStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            Behavior::Succeed(stdout) => ExecutionOutcome::completed(self.kind, *stdout, "", 0),
            Behavior::Fail(code, stderr) => {
                ExecutionOutcome::completed(self.kind, "", *stderr, *code)
            }
            Behavior::SpawnFail(message) => ExecutionOutcome::spawn_failed(self.kind, *message),
            Behavior::Timeout => ExecutionOutcome::timed_out(self.kind, "", request.timeout),
            Behavior::EchoArgs => {
                ExecutionOutcome::completed(self.kind, request.args.join(" "), "", 0)
            }
        }
    }
}

/// The three fakes, in cascade order.
pub struct Fakes {
    pub streaming: Arc<FakeStrategy>,
    pub buffered: Arc<FakeStrategy>,
    pub synchronous: Arc<FakeStrategy>,
}

impl Fakes {
    pub fn new(streaming: Behavior, buffered: Behavior, synchronous: Behavior) -> Self {
        Self {
            streaming: FakeStrategy::new(StrategyKind::Streaming, streaming),
            buffered: FakeStrategy::new(StrategyKind::Buffered, buffered),
            synchronous: FakeStrategy::new(StrategyKind::Synchronous, synchronous),
        }
    }

    pub fn executor(&self, config: ExecutorConfig) -> RobustExecutor {
        RobustExecutor::with_strategies(
            config,
            self.streaming.clone(),
            self.buffered.clone(),
            self.synchronous.clone(),
        )
    }

    pub fn call_counts(&self) -> [usize; 3] {
        [
            self.streaming.calls(),
            self.buffered.calls(),
            self.synchronous.calls(),
        ]
    }
}

pub fn test_config() -> ExecutorConfig {
    ExecutorConfig::new(std::env::temp_dir(), Duration::from_secs(5))
}
