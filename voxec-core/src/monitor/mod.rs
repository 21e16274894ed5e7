//! Execution lifecycle tracking and rate limiting.
//!
//! The monitor owns the only shared mutable state in the core: per-user
//! sliding rate windows, the in-flight execution map, and a bounded history
//! ring of finalized executions. All of it sits behind `parking_lot` locks
//! inside one `ExecutionMonitor` value shared via `Arc`; history eviction
//! happens under the same lock as the append that triggers it.
//!
//! History records carry a short hash of the source rather than the source
//! itself. Stats expose counts only.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

use crate::config::{ExecutionLimits, RateLimitConfig};

/// Who is asking for an execution. Rate windows are keyed by `user_id`,
/// falling back to `session_id` for anonymous sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionIdentity {
    pub session_id: String,
    pub user_id: Option<String>,
}

impl SessionIdentity {
    pub fn new(session_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
        }
    }

    /// The rate-limit key for this identity.
    pub fn user_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.session_id)
    }
}

/// Outcome of the admission check that starts an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    RateLimited { reason: String },
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// A finalized execution, as retained in the history ring.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    /// First 16 hex chars of the SHA-256 of the source.
    pub source_hash: String,
    pub duration_secs: f64,
    pub success: bool,
    pub output_length: usize,
    /// Error text truncated to 200 chars.
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// An execution that has started but not yet finished.
#[derive(Debug, Clone)]
struct InFlightExecution {
    session_id: String,
    user_id: Option<String>,
    source_hash: String,
    started_at: DateTime<Utc>,
    timeout_secs: u64,
}

/// Per-user rate stats, counts only.
#[derive(Debug, Clone, Serialize)]
pub struct UserRateStats {
    pub executions_last_minute: usize,
    pub executions_last_hour: usize,
    pub max_per_minute: usize,
    pub max_per_hour: usize,
}

/// Aggregate monitoring stats, counts only.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStats {
    pub active_executions: usize,
    pub total_executions: usize,
    pub successful_executions: usize,
    pub error_rate: f64,
    pub unique_users: usize,
}

const ERROR_TRUNCATE_CHARS: usize = 200;

/// Tracks in-flight and historical executions and enforces rate limits.
pub struct ExecutionMonitor {
    rate: RateLimitConfig,
    timeout_secs: u64,
    history_capacity: usize,
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
    in_flight: Mutex<HashMap<String, InFlightExecution>>,
    history: Mutex<VecDeque<ExecutionRecord>>,
}

impl ExecutionMonitor {
    pub fn new(limits: &ExecutionLimits, rate: RateLimitConfig, history_capacity: usize) -> Self {
        Self {
            rate,
            timeout_secs: limits.max_execution_time,
            history_capacity,
            windows: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Start monitoring an execution: check the caller's rate window and,
    /// if admitted, record the in-flight entry and the new timestamp.
    /// A rejection leaves the window untouched.
    pub fn begin_execution(
        &self,
        execution_id: &str,
        identity: &SessionIdentity,
        source: &str,
    ) -> AdmissionDecision {
        self.begin_execution_at(Utc::now(), execution_id, identity, source)
    }

    pub(crate) fn begin_execution_at(
        &self,
        now: DateTime<Utc>,
        execution_id: &str,
        identity: &SessionIdentity,
        source: &str,
    ) -> AdmissionDecision {
        let user_key = identity.user_key().to_string();
        let hour_ago = now - Duration::hours(1);
        let minute_ago = now - Duration::minutes(1);

        {
            let mut windows = self.windows.lock();

            // Lazy maintenance: prune every window to the 1-hour lookback
            // and evict keys whose window emptied out.
            for stamps in windows.values_mut() {
                stamps.retain(|t| *t > hour_ago);
            }
            windows.retain(|_, stamps| !stamps.is_empty());

            let window = windows.entry(user_key.clone()).or_default();
            let last_minute = window.iter().filter(|t| **t > minute_ago).count();

            if last_minute >= self.rate.max_per_minute {
                tracing::warn!(user_key = %user_key, "per-minute rate limit exceeded");
                return AdmissionDecision::RateLimited {
                    reason: format!(
                        "more than {} executions in the last minute",
                        self.rate.max_per_minute
                    ),
                };
            }

            if window.len() >= self.rate.max_per_hour {
                tracing::warn!(user_key = %user_key, "hourly rate limit exceeded");
                return AdmissionDecision::RateLimited {
                    reason: format!(
                        "more than {} executions in the last hour",
                        self.rate.max_per_hour
                    ),
                };
            }

            window.push(now);
        }

        self.in_flight.lock().insert(
            execution_id.to_string(),
            InFlightExecution {
                session_id: identity.session_id.clone(),
                user_id: identity.user_id.clone(),
                source_hash: short_source_hash(source),
                started_at: now,
                timeout_secs: self.timeout_secs,
            },
        );

        AdmissionDecision::Admitted
    }

    /// Finalize an execution: move it from the in-flight map into the
    /// bounded history ring. Unknown ids are ignored.
    pub fn finish_execution(&self, execution_id: &str, success: bool, output: &str, error: &str) {
        self.finish_execution_at(Utc::now(), execution_id, success, output, error);
    }

    pub(crate) fn finish_execution_at(
        &self,
        now: DateTime<Utc>,
        execution_id: &str,
        success: bool,
        output: &str,
        error: &str,
    ) {
        let Some(in_flight) = self.in_flight.lock().remove(execution_id) else {
            return;
        };

        let duration_secs = (now - in_flight.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let record = ExecutionRecord {
            execution_id: execution_id.to_string(),
            session_id: in_flight.session_id,
            user_id: in_flight.user_id,
            source_hash: in_flight.source_hash,
            duration_secs,
            success,
            output_length: output.len(),
            error: if error.is_empty() {
                None
            } else {
                Some(error.chars().take(ERROR_TRUNCATE_CHARS).collect())
            },
            finished_at: now,
        };

        {
            let mut history = self.history.lock();
            history.push_back(record);
            while history.len() > self.history_capacity {
                history.pop_front();
            }
        }

        if !success && !error.is_empty() {
            tracing::warn!(execution_id = %execution_id, error = %error.chars().take(100).collect::<String>(), "execution failed");
        }

        // Advisory only: flag executions brushing up against the timeout.
        if duration_secs > in_flight.timeout_secs as f64 * 0.8 {
            tracing::warn!(
                execution_id = %execution_id,
                duration_secs,
                timeout_secs = in_flight.timeout_secs,
                "execution duration close to timeout"
            );
        }
    }

    /// Rate stats for one user key.
    pub fn user_stats(&self, user_key: &str) -> UserRateStats {
        self.user_stats_at(Utc::now(), user_key)
    }

    pub(crate) fn user_stats_at(&self, now: DateTime<Utc>, user_key: &str) -> UserRateStats {
        let minute_ago = now - Duration::minutes(1);
        let hour_ago = now - Duration::hours(1);

        let windows = self.windows.lock();
        let (last_minute, last_hour) = windows
            .get(user_key)
            .map(|stamps| {
                (
                    stamps.iter().filter(|t| **t > minute_ago).count(),
                    stamps.iter().filter(|t| **t > hour_ago).count(),
                )
            })
            .unwrap_or((0, 0));

        UserRateStats {
            executions_last_minute: last_minute,
            executions_last_hour: last_hour,
            max_per_minute: self.rate.max_per_minute,
            max_per_hour: self.rate.max_per_hour,
        }
    }

    /// Aggregate stats across all users.
    pub fn monitoring_stats(&self) -> MonitoringStats {
        let history = self.history.lock();
        let total = history.len();
        let successful = history.iter().filter(|r| r.success).count();

        MonitoringStats {
            active_executions: self.in_flight.lock().len(),
            total_executions: total,
            successful_executions: successful,
            error_rate: (total - successful) as f64 / total.max(1) as f64,
            unique_users: self.windows.lock().len(),
        }
    }

    /// Snapshot of the retained history, most recent last. Records carry
    /// source hashes, never raw source.
    pub fn history_snapshot(&self) -> Vec<ExecutionRecord> {
        self.history.lock().iter().cloned().collect()
    }
}

/// First 16 hex chars of the SHA-256 of the source text.
fn short_source_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
