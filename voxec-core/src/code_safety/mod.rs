//! Static security analysis of untrusted Python source.
//!
//! Three independent passes run over every snippet and their findings are
//! concatenated (no dedup; the downstream severity gate is conservative):
//!
//! - Syntax-tree inspection via tree-sitter-python for dynamic-execution
//!   calls and dunder attribute access
//! - An ordered regex rule table for dangerous calls, imports, and
//!   path-traversal shapes
//! - Import allow/block-list checks on `import` / `from ... import` lines
//!
//! A snippet that fails to parse still goes through the pattern and import
//! passes; a syntax error alone is not a security violation.

pub mod audit;
pub mod imports;
pub mod patterns;
pub mod syntax_pass;

use serde::Serialize;
use std::collections::HashSet;

pub use audit::{AuditEntry, SecurityAuditLog};

/// Severity tiers for analysis findings. The derive order gives the
/// ordering `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A single static-analysis finding. Pure value object, never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Free-form category tag, e.g. "dangerous_function" or "blocked_import".
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    /// The offending source line, trimmed.
    pub snippet: String,
    /// 1-indexed source line when the pass could attribute one.
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl Violation {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Analyzer combining the syntax-tree, pattern, and import passes.
///
/// Stateless apart from the configured extra import allowances; safe to
/// share and call concurrently.
#[derive(Debug, Default, Clone)]
pub struct CodeSecurityAnalyzer {
    extra_allowed_imports: HashSet<String>,
}

impl CodeSecurityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the built-in safe import set with pre-approved module names
    /// from configuration. Blocked modules stay blocked regardless.
    pub fn with_allowed_imports(allowed: &HashSet<String>) -> Self {
        Self {
            extra_allowed_imports: allowed.clone(),
        }
    }

    /// Run all three passes, in fixed order, and concatenate the findings.
    pub fn analyze(&self, source: &str) -> Vec<Violation> {
        let mut violations = syntax_pass::analyze(source);
        violations.extend(patterns::analyze(source));
        violations.extend(imports::analyze(source, &self.extra_allowed_imports));
        violations
    }
}
