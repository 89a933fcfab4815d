//! Deploy command - render the template and apply it to the cluster.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use gdm_runner::{CliRunner, ExecutionResult, Invocation, RunnerError, ToolRunner};
use gdm_templates::{
    BuildInfo, Credential, DeployTarget, LocalWorkspace, RenderOutcome, RenderPipeline,
    TemplateWorkspace,
};

use crate::config::{PluginConfig, DEFAULT_GCLOUD_CMD, DEFAULT_KUBECTL_CMD, DEFAULT_TEMPLATE};

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const NAMESPACE_FILE: &str = "namespace.json";

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Service account JSON credentials
    #[arg(long, env = "PLUGIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GCP project (defaults to the project in the credentials)
    #[arg(long, env = "PLUGIN_PROJECT")]
    pub project: Option<String>,

    /// Cluster zone
    #[arg(long, env = "PLUGIN_ZONE")]
    pub zone: Option<String>,

    /// GKE cluster name
    #[arg(long, env = "PLUGIN_CLUSTER")]
    pub cluster: Option<String>,

    /// Namespace to create and deploy into
    #[arg(long, env = "PLUGIN_NAMESPACE")]
    pub namespace: Option<String>,

    /// Template for the deployment configuration
    #[arg(long, env = "PLUGIN_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// Variables to use in the template, as a JSON object
    #[arg(long, env = "PLUGIN_VARS")]
    pub vars: Option<String>,

    /// Verbose output including interpolated templates
    #[arg(long, env = "PLUGIN_VERBOSE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub verbose: bool,

    /// Render and authenticate, but do not run kubectl
    #[arg(long, env = "PLUGIN_DRY_RUN", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub dry_run: bool,

    /// Alternative gcloud command
    #[arg(long, env = "PLUGIN_GCLOUD_CMD", default_value = DEFAULT_GCLOUD_CMD)]
    pub gcloud_cmd: String,

    /// Alternative kubectl command
    #[arg(long, env = "PLUGIN_KUBECTL_CMD", default_value = DEFAULT_KUBECTL_CMD)]
    pub kubectl_cmd: String,

    /// Directory for rendered files (defaults to the system temp dir)
    #[arg(long, env = "PLUGIN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Build number
    #[arg(long, env = "DRONE_BUILD_NUMBER")]
    pub build_number: Option<String>,

    /// Commit SHA
    #[arg(long, env = "DRONE_COMMIT")]
    pub commit: Option<String>,

    /// Branch name
    #[arg(long, env = "DRONE_BRANCH")]
    pub branch: Option<String>,

    /// Tag name
    #[arg(long, env = "DRONE_TAG")]
    pub tag: Option<String>,
}

impl DeployArgs {
    pub fn into_config(self, workdir: PathBuf) -> PluginConfig {
        PluginConfig {
            credential: Credential::new(self.token.unwrap_or_default()),
            project: self.project,
            zone: self.zone.unwrap_or_default(),
            cluster: self.cluster.unwrap_or_default(),
            namespace: self.namespace,
            template: PathBuf::from(self.template),
            vars_json: self.vars,
            build: BuildInfo {
                number: self.build_number.unwrap_or_default(),
                commit: self.commit.unwrap_or_default(),
                branch: self.branch.unwrap_or_default(),
                tag: self.tag.unwrap_or_default(),
            },
            verbose: self.verbose,
            dry_run: self.dry_run,
            gcloud_cmd: self.gcloud_cmd,
            kubectl_cmd: self.kubectl_cmd,
            workdir,
            output_dir: self.output_dir.unwrap_or_else(std::env::temp_dir),
        }
    }
}

pub async fn execute(args: DeployArgs) -> Result<()> {
    let workdir = std::env::current_dir().context("Error while getting working directory")?;
    let config = args.into_config(workdir);
    let runner = CliRunner::new();

    let report = Deployer::new(&config, &runner).run().await?;

    if report.applied {
        info!(
            "Deployed {} to {}",
            config.template.display(),
            report.target.kube_context()
        );
    }
    Ok(())
}

/// Outcome of a deploy run.
#[derive(Debug)]
pub struct DeployReport {
    pub target: DeployTarget,
    pub artifact_path: PathBuf,
    /// False when kubectl was skipped for a dry run.
    pub applied: bool,
}

/// Renders the configuration and drives gcloud/kubectl through a runner.
pub struct Deployer<'a, R: ToolRunner + ?Sized> {
    config: &'a PluginConfig,
    runner: &'a R,
}

impl<'a, R: ToolRunner + ?Sized> Deployer<'a, R> {
    pub fn new(config: &'a PluginConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    pub async fn run(&self) -> Result<DeployReport> {
        let workspace = LocalWorkspace::new(&self.config.workdir, &self.config.output_dir);

        // Everything that can fail on bad input happens before any tool runs.
        let outcome = self.render(&workspace)?;
        workspace
            .publish(&outcome.artifact)
            .context("Error creating deployment file")?;

        let RenderOutcome { target, artifact } = outcome;

        let key_file = self.write_key_file()?;
        let env = BTreeMap::from([(
            CREDENTIALS_ENV.to_string(),
            key_file.path().display().to_string(),
        )]);

        self.step(
            Invocation::new(&self.config.gcloud_cmd)
                .args(["auth", "activate-service-account", "--key-file"])
                .arg(key_file.path().display().to_string()),
            &env,
        )
        .await?;

        self.step(
            Invocation::new(&self.config.gcloud_cmd)
                .args(["container", "clusters", "get-credentials"])
                .arg(&target.cluster)
                .args(["--project", target.project.as_str(), "--zone", target.zone.as_str()]),
            &env,
        )
        .await?;

        let applied = if self.config.dry_run {
            info!("Skipping kubectl apply, because dry_run: true");
            false
        } else {
            self.apply(&target, &artifact.output_path, &env).await?;
            true
        };

        if let Err(e) = key_file.close() {
            warn!("Error removing token file: {}", e);
        }

        Ok(DeployReport {
            target,
            artifact_path: artifact.output_path,
            applied,
        })
    }

    fn render(&self, workspace: &LocalWorkspace) -> Result<RenderOutcome> {
        let mut pipeline = RenderPipeline::new(workspace);
        if self.config.verbose {
            pipeline = pipeline.with_diagnostics(std::io::stdout());
        }
        Ok(pipeline.render_config(&self.config.render_request())?)
    }

    /// Write the credential where gcloud can read it. The file is removed on drop.
    fn write_key_file(&self) -> Result<NamedTempFile> {
        fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Error creating output directory {}",
                self.config.output_dir.display()
            )
        })?;
        let mut file = tempfile::Builder::new()
            .prefix("gcloud-")
            .suffix(".json")
            .tempfile_in(&self.config.output_dir)
            .context("Error writing token file")?;
        file.write_all(self.config.credential.expose().as_bytes())
            .context("Error writing token file")?;
        file.flush().context("Error writing token file")?;
        debug!("Wrote token file {:?}", file.path());
        Ok(file)
    }

    async fn apply(
        &self,
        target: &DeployTarget,
        artifact_path: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        if let Some(namespace) = &target.namespace {
            info!("Configuring kubectl to the {} namespace", namespace);

            self.step(
                Invocation::new(&self.config.kubectl_cmd)
                    .args(["config", "set-context"])
                    .arg(target.kube_context())
                    .args(["--namespace", namespace.as_str()]),
                env,
            )
            .await?;

            // `kubectl apply` succeeds when the namespace already exists,
            // unlike `kubectl create namespace`.
            let namespace_path = self.write_namespace_resource(namespace)?;
            self.step(
                Invocation::new(&self.config.kubectl_cmd)
                    .args(["apply", "--filename"])
                    .arg(namespace_path.display().to_string()),
                env,
            )
            .await?;
        }

        self.step(
            Invocation::new(&self.config.kubectl_cmd)
                .args(["apply", "--filename"])
                .arg(artifact_path.display().to_string()),
            env,
        )
        .await?;

        Ok(())
    }

    fn write_namespace_resource(&self, namespace: &str) -> Result<PathBuf> {
        let resource = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": namespace },
        });
        let path = self.config.output_dir.join(NAMESPACE_FILE);
        fs::write(&path, serde_json::to_string_pretty(&resource)?)
            .context("Error writing namespace resource file")?;
        Ok(path)
    }

    async fn step(
        &self,
        invocation: Invocation,
        env: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult> {
        let invocation = invocation.envs(env).workdir(&self.config.workdir);
        let result = self.runner.run(&invocation).await?;

        if !result.success() {
            return Err(RunnerError::ExecutionFailed {
                program: invocation.program.clone(),
                exit_code: result.exit_code,
                message: result.error_summary(),
            }
            .into());
        }
        Ok(result)
    }
}
