//! # gdm_runner
//!
//! External tool execution for the gdm deploy plugin.
//!
//! The plugin drives `gcloud` and `kubectl` as child processes. This crate
//! wraps that behind the [`ToolRunner`] trait:
//!
//! - **CliRunner**: spawns processes and echoes their output as it arrives
//! - **MockRunner**: records invocations and replays scripted responses
//!
//! A non-zero exit is not an error at this level; callers decide what a
//! failed step means.
//!
//! # Example
//!
//! ```rust,no_run
//! use gdm_runner::{CliRunner, Invocation, ToolRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = CliRunner::new();
//!
//!     let invocation = Invocation::new("kubectl")
//!         .args(["apply", "--filename", "/tmp/.gdm.yaml"])
//!         .env("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/gcloud.json");
//!
//!     let result = runner.run(&invocation).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::CliRunner;
pub use config::Invocation;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{ExecutionResult, ToolRunner};
