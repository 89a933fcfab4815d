//! Service-account credential handling.

use std::fmt;

use serde::Deserialize;

/// Raw service-account credential as supplied by the CI secret.
///
/// The contents are never printed: `Debug` is redacted and there is no
/// `Display` impl.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw credential, trimming whitespace left over from YAML secrets.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The credential bytes, for writing the key file handed to `gcloud`.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Project id embedded in the credential, if any.
    pub fn project_id(&self) -> Option<String> {
        resolve_project_id(self.0.as_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(default)]
    project_id: Option<String>,
}

/// Extract `project_id` from a service-account JSON blob.
///
/// Malformed input, a missing field, or an empty value all yield `None`.
pub fn resolve_project_id(credential: &[u8]) -> Option<String> {
    serde_json::from_slice::<ServiceAccountKey>(credential)
        .ok()
        .and_then(|key| key.project_id)
        .filter(|id| !id.is_empty())
}
