//! Tool runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Invocation;
use crate::error::RunnerResult;

/// Result of running an external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Program that was run
    pub program: String,
    /// Exit code (-1 if killed by a signal)
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last line of stderr, or a placeholder when there is none.
    pub fn error_summary(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("no error output")
            .to_string()
    }
}

/// Runs external command-line tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is reported in the result, not as an error.
    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult>;
}
