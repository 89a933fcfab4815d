//! Plugin configuration, assembled once from flags and environment.

use std::path::PathBuf;

use gdm_templates::{BuildInfo, Credential, RenderRequest};

pub const DEFAULT_TEMPLATE: &str = ".gdm.yaml";
pub const DEFAULT_GCLOUD_CMD: &str = "/google-cloud-sdk/bin/gcloud";
pub const DEFAULT_KUBECTL_CMD: &str = "/google-cloud-sdk/bin/kubectl";

/// Immutable settings for one plugin run.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub credential: Credential,
    pub project: Option<String>,
    pub zone: String,
    pub cluster: String,
    pub namespace: Option<String>,
    /// Template path, relative to `workdir` unless absolute
    pub template: PathBuf,
    pub vars_json: Option<String>,
    pub build: BuildInfo,
    pub verbose: bool,
    /// Render and authenticate, but skip every kubectl step
    pub dry_run: bool,
    pub gcloud_cmd: String,
    pub kubectl_cmd: String,
    /// Build checkout the template is read from
    pub workdir: PathBuf,
    /// Where rendered artifacts, the key file and the namespace resource go
    pub output_dir: PathBuf,
}

impl PluginConfig {
    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            credential: self.credential.clone(),
            project: self.project.clone(),
            zone: self.zone.clone(),
            cluster: self.cluster.clone(),
            namespace: self.namespace.clone(),
            template: self.template.clone(),
            build: self.build.clone(),
            vars_json: self.vars_json.clone(),
        }
    }
}
