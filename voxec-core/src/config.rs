//! Configuration for the execution guard.
//!
//! Everything is driven by `voxec.toml`; every field has a default so an
//! absent or partial file still yields a working configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Resource limits applied to a single sandboxed execution.
///
/// Set once at startup and never mutated afterwards. Memory is advisory:
/// enforcement is delegated to the external sandbox runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionLimits {
    /// Maximum wall-clock execution time in seconds.
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,

    /// Maximum output length in bytes before truncation.
    #[serde(default = "default_max_output_length")]
    pub max_output_length: usize,

    /// Advisory memory ceiling in megabytes, enforced by the sandbox.
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,

    /// Import names pre-approved in addition to the built-in safe set.
    /// A module on the blocked list stays blocked regardless.
    #[serde(default = "default_allowed_imports")]
    pub allowed_imports: HashSet<String>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_execution_time: default_max_execution_time(),
            max_output_length: default_max_output_length(),
            max_memory_mb: default_max_memory_mb(),
            allowed_imports: default_allowed_imports(),
        }
    }
}

/// Per-user execution frequency thresholds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum executions allowed within any sliding minute.
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: usize,

    /// Maximum executions allowed within any sliding hour.
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

/// Execution monitor retention settings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Number of finalized execution records kept for observability.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

/// Security audit trail settings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Record gate decisions in the in-memory audit log.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of audit entries kept before the oldest is dropped.
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_audit_capacity(),
        }
    }
}

/// Top-level configuration loaded from `voxec.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VoxecConfig {
    #[serde(default)]
    pub limits: ExecutionLimits,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// Errors raised while loading configuration from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl VoxecConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load from the given path, or fall back to defaults when no path is
    /// supplied and no `voxec.toml` exists in the working directory.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(explicit) => Self::load(explicit),
            None => {
                let implicit = Path::new("voxec.toml");
                if implicit.exists() {
                    Self::load(implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

const fn default_max_execution_time() -> u64 {
    30
}

const fn default_max_output_length() -> usize {
    1000
}

const fn default_max_memory_mb() -> u64 {
    100
}

const fn default_max_per_minute() -> usize {
    10
}

const fn default_max_per_hour() -> usize {
    50
}

const fn default_history_capacity() -> usize {
    1000
}

const fn default_audit_capacity() -> usize {
    1000
}

const fn default_true() -> bool {
    true
}

fn default_allowed_imports() -> HashSet<String> {
    [
        "math",
        "random",
        "datetime",
        "json",
        "os.path",
        "collections",
        "itertools",
        "functools",
        "re",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
