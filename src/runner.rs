//! Demo sandbox adapter: runs snippets in a local `python3` subprocess.
//!
//! This stands in for the real process-isolated sandbox collaborator. It
//! enforces nothing beyond a timeout; isolation is the responsibility of
//! whatever environment the interpreter is launched in.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use voxec_core::{CodeRunner, RunnerOutcome};

/// Conventional exit code for a timed-out command.
const TIMEOUT_EXIT_CODE: i32 = 124;

pub struct PythonProcessRunner {
    interpreter: String,
}

impl PythonProcessRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

#[async_trait]
impl CodeRunner for PythonProcessRunner {
    async fn execute(&self, source: &str, timeout: Duration) -> Result<RunnerOutcome> {
        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.interpreter))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output.context("failed to collect interpreter output")?;
                Ok(RunnerOutcome {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code().unwrap_or(-1),
                })
            }
            // Dropping the timed-out future drops the child handle, which
            // kills the interpreter via kill_on_drop.
            Err(_elapsed) => Ok(RunnerOutcome {
                success: false,
                stdout: String::new(),
                stderr: format!("execution timed out after {} seconds", timeout.as_secs()),
                exit_code: TIMEOUT_EXIT_CODE,
            }),
        }
    }
}
