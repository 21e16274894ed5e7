//! Secure execution orchestration.
//!
//! `SecureExecutor` composes the analyzer, the monitor, and the external
//! sandbox behind an ordered gate: critical findings block outright, rate
//! limits reject, and only then is the sandbox invoked - under an outer
//! timeout slightly longer than the one handed to the sandbox itself, so
//! the orchestrator always regains control. No error or panic crosses the
//! `secure_execute` boundary; every path produces an `ExecutionOutcome`
//! and finalizes any in-flight monitoring state.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::code_safety::{AuditEntry, CodeSecurityAnalyzer, SecurityAuditLog, Violation};
use crate::config::VoxecConfig;
use crate::monitor::{AdmissionDecision, ExecutionMonitor, SessionIdentity};

/// Appended to output that exceeded the configured length.
pub const TRUNCATION_MARKER: &str = "\n[output truncated for security]";

/// Extra wall-clock granted to the sandbox beyond its own timeout before
/// the orchestrator gives up on it.
const OUTER_TIMEOUT_BUFFER_SECS: u64 = 5;

/// What the external sandbox reports back for one run.
#[derive(Debug, Clone)]
pub struct RunnerOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// The external, process-isolated code execution collaborator.
///
/// Implementations are expected to run the source in an isolated process
/// and return within `timeout` plus negligible overhead, reporting their
/// own timeout as a failed outcome or an error.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn execute(&self, source: &str, timeout: Duration) -> Result<RunnerOutcome>;
}

/// Result of one gated execution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// Stdout on success; a human-readable error otherwise.
    pub output: String,
    /// All analysis findings, surfaced even when execution succeeded.
    pub violations: Vec<Violation>,
}

impl ExecutionOutcome {
    fn failure(output: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            success: false,
            output: output.into(),
            violations,
        }
    }
}

/// Policy orchestrator for voice-submitted code.
pub struct SecureExecutor {
    config: VoxecConfig,
    analyzer: CodeSecurityAnalyzer,
    monitor: Arc<ExecutionMonitor>,
    audit: SecurityAuditLog,
    runner: Arc<dyn CodeRunner>,
}

impl SecureExecutor {
    pub fn new(config: VoxecConfig, runner: Arc<dyn CodeRunner>) -> Self {
        let analyzer = CodeSecurityAnalyzer::with_allowed_imports(&config.limits.allowed_imports);
        let monitor = Arc::new(ExecutionMonitor::new(
            &config.limits,
            config.rate_limit,
            config.monitor.history_capacity,
        ));
        let audit = SecurityAuditLog::new(config.audit.enabled, config.audit.capacity);

        Self {
            config,
            analyzer,
            monitor,
            audit,
            runner,
        }
    }

    pub fn monitor(&self) -> &Arc<ExecutionMonitor> {
        &self.monitor
    }

    pub fn audit(&self) -> &SecurityAuditLog {
        &self.audit
    }

    pub fn analyzer(&self) -> &CodeSecurityAnalyzer {
        &self.analyzer
    }

    /// Analyze, rate-check, and (if clean) run `source` in the sandbox.
    ///
    /// Ordered gate: any critical violation blocks before the monitor is
    /// consulted; a rate-limit rejection returns before the sandbox is
    /// invoked; otherwise the sandbox runs under an outer timeout and the
    /// outcome - success, sandbox failure, or timeout - is finalized in the
    /// monitor and returned with all findings attached.
    pub async fn secure_execute(
        &self,
        source: &str,
        identity: &SessionIdentity,
    ) -> ExecutionOutcome {
        let execution_id = derive_execution_id(&identity.session_id, source);
        let violations = self.analyzer.analyze(source);

        let critical_descriptions: Vec<&str> = violations
            .iter()
            .filter(|v| v.is_critical())
            .map(|v| v.description.as_str())
            .collect();

        if !critical_descriptions.is_empty() {
            tracing::warn!(
                execution_id = %execution_id,
                user_key = %identity.user_key(),
                critical = critical_descriptions.len(),
                "execution blocked by security analysis"
            );
            let joined = critical_descriptions.join(", ");
            self.audit.record(AuditEntry::new(
                execution_id.as_str(),
                identity.user_key(),
                false,
                format!("blocked: {joined}"),
                critical_descriptions.len(),
                violations.len(),
            ));
            return ExecutionOutcome::failure(format!("execution blocked: {joined}"), violations);
        }

        match self
            .monitor
            .begin_execution(&execution_id, identity, source)
        {
            AdmissionDecision::RateLimited { reason } => {
                self.audit.record(AuditEntry::new(
                    execution_id.as_str(),
                    identity.user_key(),
                    false,
                    format!("rate limited: {reason}"),
                    0,
                    violations.len(),
                ));
                // A policy rejection, not a code-safety finding.
                return ExecutionOutcome::failure(
                    "rate limit exceeded, wait before retrying",
                    Vec::new(),
                );
            }
            AdmissionDecision::Admitted => {
                self.audit.record(AuditEntry::new(
                    execution_id.as_str(),
                    identity.user_key(),
                    true,
                    "admitted",
                    0,
                    violations.len(),
                ));
            }
        }

        let inner_timeout = Duration::from_secs(self.config.limits.max_execution_time);
        let outer_timeout = inner_timeout + Duration::from_secs(OUTER_TIMEOUT_BUFFER_SECS);

        match tokio::time::timeout(outer_timeout, self.runner.execute(source, inner_timeout)).await
        {
            Err(_elapsed) => {
                self.monitor
                    .finish_execution(&execution_id, false, "", "execution timeout");
                ExecutionOutcome::failure(
                    format!(
                        "code execution timed out after {} seconds",
                        self.config.limits.max_execution_time
                    ),
                    violations,
                )
            }
            Ok(Err(error)) => {
                tracing::error!(execution_id = %execution_id, error = %error, "sandbox runner failed");
                self.monitor
                    .finish_execution(&execution_id, false, "", &error.to_string());
                ExecutionOutcome::failure(format!("execution error: {error}"), violations)
            }
            Ok(Ok(result)) => {
                let stdout = truncate_output(&result.stdout, self.config.limits.max_output_length);

                self.monitor.finish_execution(
                    execution_id.as_str(),
                    result.success,
                    &stdout,
                    &result.stderr,
                );

                if result.success {
                    ExecutionOutcome {
                        success: true,
                        output: stdout,
                        violations,
                    }
                } else {
                    let error_text = if result.stderr.is_empty() {
                        format!("execution failed with exit code {}", result.exit_code)
                    } else {
                        truncate_output(&result.stderr, self.config.limits.max_output_length)
                    };
                    ExecutionOutcome::failure(error_text, violations)
                }
            }
        }
    }
}

/// Derive a collision-resistant execution id from the session, the source,
/// and the current time.
fn derive_execution_id(session_id: &str, source: &str) -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let digest = Sha256::digest(format!("{session_id}{source}{now}").as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Truncate to `max` bytes (respecting char boundaries) and append the
/// truncation marker.
fn truncate_output(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }

    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{TRUNCATION_MARKER}", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_ids_are_unique_per_call() {
        let first = derive_execution_id("session", "x = 1");
        let second = derive_execution_id("session", "x = 1");
        assert_eq!(first.len(), 16);
        // Nanosecond timestamps make collisions implausible.
        assert_ne!(first, second);
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("hello", 100), "hello");
    }

    #[test]
    fn long_output_is_cut_and_marked() {
        let long = "a".repeat(500);
        let truncated = truncate_output(&long, 100);
        assert_eq!(truncated, format!("{}{TRUNCATION_MARKER}", "a".repeat(100)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld".repeat(20);
        let truncated = truncate_output(&text, 10);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }
}
