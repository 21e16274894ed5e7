//! End-to-end scenarios for the secure execution gate, driven with a
//! counting mock sandbox so blocked paths can assert the sandbox was never
//! consulted.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use voxec_core::{
    CodeRunner, ExecutionLimits, RateLimitConfig, RunnerOutcome, SecureExecutor, SessionIdentity,
    TRUNCATION_MARKER, VoxecConfig, parse_voice_input,
};

/// Mock sandbox returning a fixed outcome and counting invocations.
struct FixedRunner {
    calls: Arc<AtomicUsize>,
    outcome: RunnerOutcome,
}

impl FixedRunner {
    fn new(outcome: RunnerOutcome) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = Arc::new(Self {
            calls: Arc::clone(&calls),
            outcome,
        });
        (runner, calls)
    }

    fn succeeding(stdout: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        Self::new(RunnerOutcome {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

#[async_trait]
impl CodeRunner for FixedRunner {
    async fn execute(&self, _source: &str, _timeout: Duration) -> Result<RunnerOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

/// Mock sandbox that never returns within any reasonable timeout.
struct HangingRunner;

#[async_trait]
impl CodeRunner for HangingRunner {
    async fn execute(&self, _source: &str, _timeout: Duration) -> Result<RunnerOutcome> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the orchestrator must time out first")
    }
}

/// Mock sandbox that reports an internal failure.
struct FailingRunner;

#[async_trait]
impl CodeRunner for FailingRunner {
    async fn execute(&self, _source: &str, _timeout: Duration) -> Result<RunnerOutcome> {
        anyhow::bail!("interpreter missing")
    }
}

fn identity() -> SessionIdentity {
    SessionIdentity::new("session-1", Some("user-1".to_string()))
}

#[tokio::test]
async fn voice_print_round_trip_succeeds() {
    let request = parse_voice_input("run print('hello')").expect("should parse");
    assert_eq!(request.extracted_code, "print('hello')");

    let (runner, calls) = FixedRunner::succeeding("hello\n");
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    let outcome = executor
        .secure_execute(&request.extracted_code, &identity())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.output, "hello\n");
    assert!(outcome.violations.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blocked_import_never_reaches_the_sandbox() {
    let request = parse_voice_input("execute import os").expect("should parse");
    assert_eq!(request.extracted_code, "import os");

    let (runner, calls) = FixedRunner::succeeding("unreachable");
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    let outcome = executor
        .secure_execute(&request.extracted_code, &identity())
        .await;

    assert!(!outcome.success);
    assert!(outcome.output.starts_with("execution blocked: "));
    assert!(outcome.output.contains("blocked import: os"));
    assert!(
        outcome
            .violations
            .iter()
            .any(|v| v.kind == "blocked_import" && v.is_critical())
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn eval_is_blocked_before_execution() {
    let (runner, calls) = FixedRunner::succeeding("unreachable");
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    let outcome = executor.secure_execute("eval('1+1')", &identity()).await;

    assert!(!outcome.success);
    assert!(outcome.output.starts_with("execution blocked: "));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_output_is_truncated_with_marker() {
    let (runner, _calls) = FixedRunner::succeeding(&"a".repeat(500));

    let config = VoxecConfig {
        limits: ExecutionLimits {
            max_output_length: 100,
            ..ExecutionLimits::default()
        },
        ..VoxecConfig::default()
    };
    let executor = SecureExecutor::new(config, runner);

    let outcome = executor.secure_execute("print('a' * 500)", &identity()).await;

    assert!(outcome.success);
    assert_eq!(
        outcome.output,
        format!("{}{TRUNCATION_MARKER}", "a".repeat(100))
    );
}

#[tokio::test(start_paused = true)]
async fn hanging_sandbox_hits_the_outer_timeout() {
    let config = VoxecConfig {
        limits: ExecutionLimits {
            max_execution_time: 2,
            ..ExecutionLimits::default()
        },
        ..VoxecConfig::default()
    };
    let executor = SecureExecutor::new(config, Arc::new(HangingRunner));

    let outcome = executor.secure_execute("while True: pass", &identity()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.output, "code execution timed out after 2 seconds");

    // The in-flight record was finalized, not leaked.
    let stats = executor.monitor().monitoring_stats();
    assert_eq!(stats.active_executions, 0);
    assert_eq!(stats.total_executions, 1);
}

#[tokio::test]
async fn runner_error_becomes_failure_outcome() {
    let executor = SecureExecutor::new(VoxecConfig::default(), Arc::new(FailingRunner));

    let outcome = executor.secure_execute("x = 1", &identity()).await;

    assert!(!outcome.success);
    assert!(outcome.output.starts_with("execution error: "));
    assert_eq!(executor.monitor().monitoring_stats().active_executions, 0);
}

#[tokio::test]
async fn sandbox_failure_carries_stderr() {
    let (runner, _calls) = FixedRunner::new(RunnerOutcome {
        success: false,
        stdout: String::new(),
        stderr: "NameError: name 'y' is not defined".to_string(),
        exit_code: 1,
    });
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    let outcome = executor.secure_execute("print(y)", &identity()).await;

    assert!(!outcome.success);
    assert!(outcome.output.contains("NameError"));
}

#[tokio::test]
async fn rate_limited_user_gets_policy_rejection() {
    let (runner, calls) = FixedRunner::succeeding("ok\n");
    let config = VoxecConfig {
        rate_limit: RateLimitConfig {
            max_per_minute: 1,
            max_per_hour: 50,
        },
        ..VoxecConfig::default()
    };
    let executor = SecureExecutor::new(config, runner);

    let first = executor.secure_execute("x = 1", &identity()).await;
    assert!(first.success);

    let second = executor.secure_execute("x = 2", &identity()).await;
    assert!(!second.success);
    assert_eq!(second.output, "rate limit exceeded, wait before retrying");
    assert!(second.violations.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn advisory_violations_survive_successful_execution() {
    let (runner, calls) = FixedRunner::succeeding("done\n");
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    // Unknown import is medium: execution proceeds, the finding is surfaced.
    let outcome = executor
        .secure_execute("import numpy\nprint('done')", &identity())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].kind, "unknown_import");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gate_decisions_land_in_the_audit_log() {
    let (runner, _calls) = FixedRunner::succeeding("ok\n");
    let executor = SecureExecutor::new(VoxecConfig::default(), runner);

    executor.secure_execute("x = 1", &identity()).await;
    executor.secure_execute("import os", &identity()).await;

    let audit = executor.audit();
    assert_eq!(audit.len(), 2);
    let denied = audit.denied_entries();
    assert_eq!(denied.len(), 1);
    assert!(denied[0].reason.contains("blocked"));
    assert_eq!(denied[0].critical_violations, 1);
}
