//! Audit trail for execution gate decisions.
//!
//! Records every admit/block decision the orchestrator makes, including
//! blocks that never reach the execution monitor, so a security review can
//! reconstruct what was refused and why.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// A single gate decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub execution_id: String,
    pub user_key: String,
    /// Whether the execution was admitted to the sandbox.
    pub admitted: bool,
    /// Reason for the decision.
    pub reason: String,
    pub critical_violations: usize,
    pub total_violations: usize,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        execution_id: impl Into<String>,
        user_key: impl Into<String>,
        admitted: bool,
        reason: impl Into<String>,
        critical_violations: usize,
        total_violations: usize,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            user_key: user_key.into(),
            admitted,
            reason: reason.into(),
            critical_violations,
            total_violations,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded in-memory decision log. Clones share the same entries.
#[derive(Clone)]
pub struct SecurityAuditLog {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
    enabled: bool,
    capacity: usize,
}

impl SecurityAuditLog {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            enabled,
            capacity,
        }
    }

    /// Append an entry, evicting the oldest once over capacity.
    pub fn record(&self, entry: AuditEntry) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries for executions that were refused.
    pub fn denied_entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.admitted)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
