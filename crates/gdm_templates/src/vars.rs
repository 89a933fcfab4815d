//! Template variables and their composition.
//!
//! A [`VariableSet`] is assembled once per render from three sources, in
//! order: built-in build metadata, fields derived from the deploy target, and
//! the caller's free-form variables. No source may redefine a name already
//! placed by an earlier one.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// Keys left out of diagnostic dumps.
const DIAGNOSTIC_OMITTED_KEYS: &[&str] = &["workspace"];

/// Name-to-value mapping used as template context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableSet {
    values: BTreeMap<String, Value>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used to assemble the individual sources.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Parse caller-supplied variables from a JSON object.
    ///
    /// A blank string or `null` means no variables.
    pub fn from_json(json: &str) -> TemplateResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }

        let parsed: Value =
            serde_json::from_str(json).map_err(|e| TemplateError::InvalidVars(e.to_string()))?;

        match parsed {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            other => Err(TemplateError::InvalidVars(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Resolve a dotted field path such as `["config", "replicas"]`.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(first.as_ref())?;
        for segment in rest {
            current = current.as_object()?.get(segment.as_ref())?;
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Pretty JSON of the set for diagnostics, without workspace-only keys.
    pub fn diagnostic_dump(&self) -> TemplateResult<String> {
        let visible: BTreeMap<&str, &Value> = self
            .iter()
            .filter(|(k, _)| !DIAGNOSTIC_OMITTED_KEYS.contains(k))
            .collect();
        Ok(serde_json::to_string_pretty(&visible)?)
    }

    fn insert_new(&mut self, name: &str, value: &Value) -> TemplateResult<()> {
        if self.values.contains_key(name) {
            return Err(TemplateError::Shadowed(name.to_string()));
        }
        self.values.insert(name.to_string(), value.clone());
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build metadata exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub number: String,
    pub commit: String,
    pub branch: String,
    pub tag: String,
}

impl BuildInfo {
    pub fn to_variables(&self) -> VariableSet {
        VariableSet::new()
            .with("BUILD_NUMBER", self.number.as_str())
            .with("COMMIT", self.commit.as_str())
            .with("BRANCH", self.branch.as_str())
            .with("TAG", self.tag.as_str())
    }
}

/// Where the rendered configuration is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployTarget {
    pub project: String,
    pub zone: String,
    pub cluster: String,
    pub namespace: Option<String>,
}

impl DeployTarget {
    /// Fields derived from the target, all present even when blank.
    pub fn to_variables(&self) -> VariableSet {
        VariableSet::new()
            .with("project", self.project.as_str())
            .with("zone", self.zone.as_str())
            .with("cluster", self.cluster.as_str())
            .with("namespace", self.namespace.as_deref().unwrap_or(""))
    }

    /// kubectl context name created by `gcloud container clusters get-credentials`.
    pub fn kube_context(&self) -> String {
        ["gke", &self.project, &self.zone, &self.cluster].join("_")
    }
}

/// Merge the three variable sources into a single template context.
///
/// Fails with [`TemplateError::Shadowed`] on the first name that is already
/// defined by an earlier source. Inputs are never modified.
pub fn compose(
    builtins: &VariableSet,
    derived: &VariableSet,
    user: &VariableSet,
) -> TemplateResult<VariableSet> {
    let mut composed = builtins.clone();

    for (name, value) in derived.iter().chain(user.iter()) {
        composed.insert_new(name, value)?;
    }

    debug!(
        "Composed {} template variables ({} user-supplied)",
        composed.len(),
        user.len()
    );
    Ok(composed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtins() -> VariableSet {
        BuildInfo {
            number: "42".into(),
            commit: "abc123".into(),
            ..Default::default()
        }
        .to_variables()
    }

    fn derived() -> VariableSet {
        VariableSet::new().with("project", "my-proj")
    }

    #[test]
    fn test_compose_merges_all_sources() {
        let user = VariableSet::from_json(r#"{"region":"us-east1","replicas":3}"#).unwrap();
        let vars = compose(&builtins(), &derived(), &user).unwrap();

        assert_eq!(vars.get("BUILD_NUMBER"), Some(&json!("42")));
        assert_eq!(vars.get("project"), Some(&json!("my-proj")));
        assert_eq!(vars.get("region"), Some(&json!("us-east1")));
        assert_eq!(vars.get("replicas"), Some(&json!(3)));
        assert_eq!(vars.len(), 7);
    }

    #[test]
    fn test_user_var_shadowing_builtin_fails() {
        let base = builtins();
        let before = base.clone();
        let user = VariableSet::new().with("COMMIT", "forged");

        let err = compose(&base, &derived(), &user).unwrap_err();
        assert!(matches!(err, TemplateError::Shadowed(ref k) if k == "COMMIT"));
        assert_eq!(base, before);
    }

    #[test]
    fn test_user_var_shadowing_derived_fails() {
        let user = VariableSet::from_json(r#"{"project":"other"}"#).unwrap();
        let err = compose(&builtins(), &derived(), &user).unwrap_err();
        assert!(matches!(err, TemplateError::Shadowed(ref k) if k == "project"));
    }

    #[test]
    fn test_derived_shadowing_builtin_fails() {
        let derived = VariableSet::new().with("TAG", "v1");
        let err = compose(&builtins(), &derived, &VariableSet::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Shadowed(ref k) if k == "TAG"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(matches!(
            VariableSet::from_json("[1,2]"),
            Err(TemplateError::InvalidVars(_))
        ));
        assert!(matches!(
            VariableSet::from_json("\"text\""),
            Err(TemplateError::InvalidVars(_))
        ));
        assert!(matches!(
            VariableSet::from_json("{not json"),
            Err(TemplateError::InvalidVars(_))
        ));
        assert!(VariableSet::from_json("").unwrap().is_empty());
        assert!(VariableSet::from_json("null").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_nested() {
        let vars = VariableSet::from_json(r#"{"app":{"image":{"tag":"1.2"}},"flat":"x"}"#).unwrap();
        assert_eq!(vars.lookup(&["app", "image", "tag"]), Some(&json!("1.2")));
        assert_eq!(vars.lookup(&["flat"]), Some(&json!("x")));
        assert_eq!(vars.lookup(&["flat", "deeper"]), None);
        assert_eq!(vars.lookup(&["app", "missing"]), None);
        assert_eq!(vars.lookup::<&str>(&[]), None);
    }

    #[test]
    fn test_target_variables_and_context() {
        let target = DeployTarget {
            project: "p".into(),
            zone: "us-central1-a".into(),
            cluster: "main".into(),
            namespace: None,
        };
        let vars = target.to_variables();
        assert_eq!(vars.get("namespace"), Some(&json!("")));
        assert_eq!(target.kube_context(), "gke_p_us-central1-a_main");
    }

    #[test]
    fn test_diagnostic_dump_omits_workspace() {
        let vars = VariableSet::new()
            .with("workspace", json!({"path": "/drone/src"}))
            .with("project", "p");
        let dump = vars.diagnostic_dump().unwrap();
        assert!(dump.contains("\"project\""));
        assert!(!dump.contains("workspace"));
    }
}
