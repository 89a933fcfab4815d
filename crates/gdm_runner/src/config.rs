//! Tool invocation configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single external command to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Program path or name (e.g. `/google-cloud-sdk/bin/gcloud`)
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// Working directory (inherits the current one if unset)
    pub workdir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            workdir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add every variable from `vars`.
    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            if arg.is_empty() || arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new("kubectl")
            .arg("apply")
            .args(["--filename", "/tmp/app.yaml"])
            .env("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json")
            .workdir("/src");

        assert_eq!(invocation.args, vec!["apply", "--filename", "/tmp/app.yaml"]);
        assert_eq!(
            invocation.env.get("GOOGLE_APPLICATION_CREDENTIALS"),
            Some(&"/tmp/key.json".to_string())
        );
        assert_eq!(invocation.workdir, Some(PathBuf::from("/src")));
    }

    #[test]
    fn test_command_line_quotes() {
        let invocation = Invocation::new("gcloud").args(["config", "set", "a=b", "two words", ""]);
        assert_eq!(
            invocation.command_line(),
            "gcloud config set 'a=b' 'two words' ''"
        );
    }
}
