//! # gdm_templates
//!
//! Variable composition and strict template rendering for the gdm deploy
//! plugin.
//!
//! A render goes through four steps:
//!
//! - the project id is taken from the request or derived from the
//!   service-account credential
//! - build metadata, deploy-target fields and caller variables are merged
//!   into a [`VariableSet`], rejecting any name defined twice
//! - the template is parsed completely, then rendered; a field missing from
//!   the variables fails the render
//! - the artifact is returned for the caller to publish and apply
//!
//! ## Example
//!
//! ```rust,no_run
//! use gdm_templates::{BuildInfo, Credential, LocalWorkspace, RenderPipeline, RenderRequest};
//! use std::path::PathBuf;
//!
//! let workspace = LocalWorkspace::new(".", std::env::temp_dir());
//! let request = RenderRequest {
//!     credential: Credential::new(r#"{"project_id":"my-proj"}"#),
//!     project: None,
//!     zone: "us-east1-b".to_string(),
//!     cluster: "main".to_string(),
//!     namespace: None,
//!     template: PathBuf::from(".gdm.yaml"),
//!     build: BuildInfo::default(),
//!     vars_json: Some(r#"{"region":"us-east1"}"#.to_string()),
//! };
//!
//! let outcome = RenderPipeline::new(&workspace).render_config(&request).unwrap();
//! println!("{}", outcome.artifact.content);
//! ```

pub mod credential;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod vars;
pub mod workspace;

pub use credential::{resolve_project_id, Credential};
pub use error::{TemplateError, TemplateResult};
pub use pipeline::{RenderOutcome, RenderPipeline, RenderRequest, RenderedArtifact};
pub use renderer::{render, Template};
pub use vars::{compose, BuildInfo, DeployTarget, VariableSet};
pub use workspace::{LocalWorkspace, TemplateWorkspace};
