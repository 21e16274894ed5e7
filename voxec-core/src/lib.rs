//! # voxec-core - voice-triggered code execution guard
//!
//! `voxec-core` powers the voxec execution guard. It provides the policy
//! and analysis layer that decides whether voice-submitted Python snippets
//! may be handed to an external, process-isolated interpreter.
//!
//! ## Highlights
//!
//! - **Intent Parsing**: layered extraction of candidate source from noisy
//!   voice-transcribed text, including spoken-punctuation normalization
//!   ("x equals 5" becomes `x=5`).
//! - **Layered Static Analysis**: tree-sitter-python syntax-tree
//!   inspection, an ordered regex rule table, and import allow/block lists,
//!   producing typed findings with severities from low to critical.
//! - **Execution Policy**: critical findings block unconditionally;
//!   per-user sliding-window rate limits bound execution frequency; output
//!   is truncated to configured limits; the sandbox runs under an outer
//!   timeout so the orchestrator always regains control.
//! - **Observability**: bounded execution history keyed by source hash,
//!   per-user and aggregate stats, and an audit trail of gate decisions.
//! - **Configuration-First**: everything is driven by `voxec.toml`, with
//!   defaults for every field.
//!
//! The sandbox itself is out of scope: it is consumed through the
//! [`CodeRunner`] trait and assumed to be process-isolated elsewhere.
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxec_core::{SecureExecutor, SessionIdentity, VoxecConfig, parse_voice_input};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = VoxecConfig::load_or_default(None).expect("config");
//!     let executor = SecureExecutor::new(config, Arc::new(MySandbox));
//!
//!     if let Some(request) = parse_voice_input("run print('hello')") {
//!         let identity = SessionIdentity::new("session-1", None);
//!         let outcome = executor
//!             .secure_execute(&request.extracted_code, &identity)
//!             .await;
//!         println!("{}", outcome.output);
//!     }
//! }
//! ```

pub mod code_safety;
pub mod config;
pub mod exec;
pub mod intent;
pub mod monitor;
pub mod speech;

pub use code_safety::{
    AuditEntry, CodeSecurityAnalyzer, SecurityAuditLog, Severity, Violation,
};
pub use config::{AuditConfig, ExecutionLimits, MonitorConfig, RateLimitConfig, VoxecConfig};
pub use exec::{CodeRunner, ExecutionOutcome, RunnerOutcome, SecureExecutor, TRUNCATION_MARKER};
pub use intent::{CodeIntent, CodeRequest, clean_code, parse_voice_input};
pub use monitor::{
    AdmissionDecision, ExecutionMonitor, ExecutionRecord, MonitoringStats, SessionIdentity,
    UserRateStats,
};
