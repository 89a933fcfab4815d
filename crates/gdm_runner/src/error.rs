//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running external tools.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("{program} exited with code {exit_code}: {message}")]
    ExecutionFailed {
        program: String,
        exit_code: i64,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
