//! Filesystem access for templates and rendered artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::pipeline::RenderedArtifact;

/// Where templates are read from and rendered artifacts are written to.
pub trait TemplateWorkspace {
    /// Read the template at `path`. A missing file is [`TemplateError::TemplateNotFound`].
    fn read_template(&self, path: &Path) -> TemplateResult<String>;

    /// Path the artifact rendered from `template` should be published at.
    fn artifact_path(&self, template: &Path) -> PathBuf;

    /// Make a rendered artifact available at its output path.
    fn publish(&self, artifact: &RenderedArtifact) -> TemplateResult<()>;
}

/// Workspace backed by the local filesystem.
///
/// Relative template paths resolve against `root` (the build checkout);
/// artifacts are written flat into `output_dir` under the template's file name.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
    output_dir: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl TemplateWorkspace for LocalWorkspace {
    fn read_template(&self, path: &Path) -> TemplateResult<String> {
        let full = self.root.join(path);
        if !full.is_file() {
            return Err(TemplateError::TemplateNotFound(full));
        }
        debug!("Reading template {:?}", full);
        Ok(fs::read_to_string(&full)?)
    }

    fn artifact_path(&self, template: &Path) -> PathBuf {
        let file_name = template
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rendered.yaml"));
        self.output_dir.join(file_name)
    }

    fn publish(&self, artifact: &RenderedArtifact) -> TemplateResult<()> {
        if let Some(parent) = artifact.output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&artifact.output_path, &artifact.content)?;
        info!("Wrote deployment file {:?}", artifact.output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_template() {
        let dir = tempdir().unwrap();
        let workspace = LocalWorkspace::new(dir.path(), dir.path().join("out"));

        let err = workspace.read_template(Path::new(".gdm.yaml")).unwrap_err();
        assert!(matches!(err, TemplateError::TemplateNotFound(ref p) if p.ends_with(".gdm.yaml")));
    }

    #[test]
    fn test_artifact_path_uses_file_name() {
        let workspace = LocalWorkspace::new("/src", "/tmp/gdm");
        assert_eq!(
            workspace.artifact_path(Path::new("deploy/app.yaml")),
            PathBuf::from("/tmp/gdm/app.yaml")
        );
    }

    #[test]
    fn test_read_and_publish() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.yaml"), "kind: {{ .kind }}").unwrap();
        let workspace = LocalWorkspace::new(dir.path(), dir.path().join("out"));

        let source = workspace.read_template(Path::new("app.yaml")).unwrap();
        assert_eq!(source, "kind: {{ .kind }}");

        let artifact = RenderedArtifact {
            template: PathBuf::from("app.yaml"),
            output_path: workspace.artifact_path(Path::new("app.yaml")),
            content: "kind: Service".to_string(),
        };
        workspace.publish(&artifact).unwrap();

        let written = fs::read_to_string(dir.path().join("out").join("app.yaml")).unwrap();
        assert_eq!(written, "kind: Service");
    }
}
