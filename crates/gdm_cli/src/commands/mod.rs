//! CLI definition.
//!
//! The plugin runs as a single command; every flag can also be supplied
//! through the environment variables the CI system sets for plugin settings
//! (`PLUGIN_*`) and build metadata (`DRONE_*`).

use clap::Parser;

pub mod deploy;

/// gdm - render a deployment template and apply it to a GKE cluster
#[derive(Parser)]
#[command(name = "gdm")]
#[command(version, about = "Render a deployment template and apply it to a GKE cluster")]
#[command(long_about = r#"
Renders a deployment template with build metadata and user variables, then
applies it to a GKE cluster with gcloud and kubectl.

TEMPLATE VARIABLES:
  BUILD_NUMBER, COMMIT, BRANCH, TAG    build metadata
  project, zone, cluster, namespace    deploy target
  anything in --vars                   may not redefine the names above

Placeholders use {{ .name }} syntax. Referencing an undefined variable is
an error.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Missing parameter or invalid variables
  4 - Template error
  5 - gcloud/kubectl error
"#)]
pub struct Cli {
    #[command(flatten)]
    pub deploy: deploy::DeployArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "gdm",
            "--token",
            "{}",
            "--zone",
            "us-east1-b",
            "--cluster",
            "prod",
            "--namespace",
            "web",
            "--template",
            "deploy/app.yaml",
            "--vars",
            r#"{"replicas":2}"#,
            "--dry-run",
            "--verbose",
        ])
        .unwrap();

        let args = cli.deploy;
        assert_eq!(args.zone.as_deref(), Some("us-east1-b"));
        assert_eq!(args.cluster.as_deref(), Some("prod"));
        assert_eq!(args.namespace.as_deref(), Some("web"));
        assert_eq!(args.template, "deploy/app.yaml");
        assert_eq!(args.vars.as_deref(), Some(r#"{"replicas":2}"#));
        assert!(args.dry_run);
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
