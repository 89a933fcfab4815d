//! Render pipeline: validate inputs, compose variables, render the template.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::credential::Credential;
use crate::error::{TemplateError, TemplateResult};
use crate::renderer::Template;
use crate::vars::{compose, BuildInfo, DeployTarget, VariableSet};
use crate::workspace::TemplateWorkspace;

/// Everything needed to render one deployment configuration.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub credential: Credential,
    /// Explicit project; derived from the credential when absent.
    pub project: Option<String>,
    pub zone: String,
    pub cluster: String,
    pub namespace: Option<String>,
    pub template: PathBuf,
    pub build: BuildInfo,
    /// Caller variables as a JSON object.
    pub vars_json: Option<String>,
}

impl RenderRequest {
    /// Check required parameters and resolve the deploy target.
    ///
    /// Runs before any template work; the project falls back to the one
    /// embedded in the credential.
    pub fn resolve_target(&self) -> TemplateResult<DeployTarget> {
        if self.credential.is_empty() {
            return Err(TemplateError::MissingRequiredParam("token"));
        }

        let project = match self.project.as_deref().filter(|p| !p.is_empty()) {
            Some(explicit) => explicit.to_string(),
            None => {
                let derived = self
                    .credential
                    .project_id()
                    .ok_or(TemplateError::MissingRequiredParam("project"))?;
                info!("Using project {} from service account credential", derived);
                derived
            }
        };

        if self.zone.trim().is_empty() {
            return Err(TemplateError::MissingRequiredParam("zone"));
        }

        Ok(DeployTarget {
            project,
            zone: self.zone.clone(),
            cluster: self.cluster.clone(),
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
        })
    }
}

/// Rendered configuration handed to the apply step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Template the artifact was rendered from.
    pub template: PathBuf,
    /// Where the artifact should be published.
    pub output_path: PathBuf,
    pub content: String,
}

impl RenderedArtifact {
    /// Number of non-empty YAML documents in the content.
    pub fn document_count(&self) -> TemplateResult<usize> {
        let mut count = 0;
        for document in serde_yaml::Deserializer::from_str(&self.content) {
            let value = serde_yaml::Value::deserialize(document)?;
            if !value.is_null() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub target: DeployTarget,
    pub artifact: RenderedArtifact,
}

/// Drives credential resolution, variable composition and rendering for a
/// single template.
pub struct RenderPipeline<'a> {
    workspace: &'a dyn TemplateWorkspace,
    diagnostics: Option<Box<dyn Write + 'a>>,
}

impl<'a> RenderPipeline<'a> {
    pub fn new(workspace: &'a dyn TemplateWorkspace) -> Self {
        Self {
            workspace,
            diagnostics: None,
        }
    }

    /// Dump the composed variables and the rendered artifact to `sink`.
    pub fn with_diagnostics(mut self, sink: impl Write + 'a) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    /// Render the request's template. Nothing is written to the workspace;
    /// publishing the artifact is up to the caller.
    pub fn render_config(&mut self, request: &RenderRequest) -> TemplateResult<RenderOutcome> {
        let target = request.resolve_target()?;

        let user_vars = match &request.vars_json {
            Some(json) => VariableSet::from_json(json)?,
            None => VariableSet::new(),
        };
        let vars = compose(
            &request.build.to_variables(),
            &target.to_variables(),
            &user_vars,
        )?;

        if self.diagnostics.is_some() {
            let dump = vars.diagnostic_dump()?;
            self.dump("DATA (Workspace Values Omitted)", &dump)?;
        }

        let source = self.workspace.read_template(&request.template)?;
        let template = Template::parse(template_name(&request.template), &source)?;
        let content = template.render(&vars)?;

        let artifact = RenderedArtifact {
            template: request.template.clone(),
            output_path: self.workspace.artifact_path(&request.template),
            content,
        };

        match artifact.document_count() {
            Ok(count) => debug!("Rendered {} YAML document(s)", count),
            Err(e) => warn!("Rendered configuration is not valid YAML: {}", e),
        }

        if self.diagnostics.is_some() {
            self.dump("DEPLOYMENT", &artifact.content)?;
        }

        Ok(RenderOutcome { target, artifact })
    }

    fn dump(&mut self, title: &str, body: &str) -> TemplateResult<()> {
        if let Some(sink) = self.diagnostics.as_mut() {
            writeln!(sink, "---START {}---", title)?;
            writeln!(sink, "{}", body.trim_end())?;
            writeln!(sink, "---END {}---", title)?;
        }
        Ok(())
    }
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(credential: &str) -> RenderRequest {
        RenderRequest {
            credential: Credential::new(credential),
            project: None,
            zone: "us-east1-b".to_string(),
            cluster: "main".to_string(),
            namespace: None,
            template: PathBuf::from(".gdm.yaml"),
            build: BuildInfo::default(),
            vars_json: None,
        }
    }

    #[test]
    fn test_resolve_target_derives_project() {
        let target = request(r#"{"project_id":"my-proj"}"#).resolve_target().unwrap();
        assert_eq!(target.project, "my-proj");
        assert_eq!(target.zone, "us-east1-b");
    }

    #[test]
    fn test_explicit_project_wins() {
        let mut req = request(r#"{"project_id":"my-proj"}"#);
        req.project = Some("override".to_string());
        assert_eq!(req.resolve_target().unwrap().project, "override");
    }

    #[test]
    fn test_missing_token() {
        let err = request("   ").resolve_target().unwrap_err();
        assert!(matches!(err, TemplateError::MissingRequiredParam("token")));
    }

    #[test]
    fn test_missing_project() {
        let err = request("not-json").resolve_target().unwrap_err();
        assert!(matches!(err, TemplateError::MissingRequiredParam("project")));

        let mut req = request("not-json");
        req.project = Some(String::new());
        assert!(matches!(
            req.resolve_target(),
            Err(TemplateError::MissingRequiredParam("project"))
        ));
    }

    #[test]
    fn test_missing_zone() {
        let mut req = request(r#"{"project_id":"p"}"#);
        req.zone = String::new();
        assert!(matches!(
            req.resolve_target(),
            Err(TemplateError::MissingRequiredParam("zone"))
        ));
    }

    #[test]
    fn test_empty_namespace_is_none() {
        let mut req = request(r#"{"project_id":"p"}"#);
        req.namespace = Some(String::new());
        assert_eq!(req.resolve_target().unwrap().namespace, None);
    }

    #[test]
    fn test_document_count() {
        let artifact = RenderedArtifact {
            template: PathBuf::from("a.yaml"),
            output_path: PathBuf::from("/tmp/a.yaml"),
            content: "kind: Service\n---\nkind: Deployment\n---\n".to_string(),
        };
        assert_eq!(artifact.document_count().unwrap(), 2);
    }
}
