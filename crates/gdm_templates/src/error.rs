//! Error types for rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rendering operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while composing variables or rendering a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Missing required param: {0}")]
    MissingRequiredParam(&'static str),

    #[error("var {0:?} shadows existing var")]
    Shadowed(String),

    #[error("Invalid vars: {0}")]
    InvalidVars(String),

    #[error("Error parsing template {template} at line {line}, column {column}: {message}")]
    Parse {
        template: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Template references undefined variable: {0}")]
    MissingVariable(String),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TemplateError {
    /// True for errors caused by the caller's parameters or variables rather
    /// than the template itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredParam(_) | Self::Shadowed(_) | Self::InvalidVars(_)
        )
    }
}
