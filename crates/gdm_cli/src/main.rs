//! gdm plugin - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Missing parameter or invalid variables
//! - 4: Template error
//! - 5: gcloud/kubectl error

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gdm_runner::RunnerError;
use gdm_templates::TemplateError;

mod commands;
mod config;

use commands::Cli;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_PARAMS: u8 = 2;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const DEPLOY_ERROR: u8 = 5;
}

const REV: &str = match option_env!("GDM_REV") {
    Some(rev) => rev,
    None => "[unknown]",
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.deploy.verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for crate_name in ["gdm_cli", "gdm_templates", "gdm_runner"] {
        if let Ok(directive) = format!("{}={}", crate_name, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    info!("gdm plugin {} built from {}", env!("CARGO_PKG_VERSION"), REV);

    match commands::deploy::execute(cli.deploy).await {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Pick the exit code from the first typed error in the chain.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return match err {
                TemplateError::Io(_) => ExitCodes::GENERAL_ERROR,
                err if err.is_input_error() => ExitCodes::INVALID_PARAMS,
                _ => ExitCodes::TEMPLATE_ERROR,
            };
        }
        if cause.downcast_ref::<RunnerError>().is_some() {
            return ExitCodes::DEPLOY_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
