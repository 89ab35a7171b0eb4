//! Skill manifest types and loading.
//!
//! A [`SkillManifest`] declares a skill's identity, its entrypoint relative to
//! the manifest's directory, the capabilities it claims to need and an
//! optional run deadline. Manifests are JSON documents with camelCase keys:
//!
//! ```json
//! {
//!   "name": "weather",
//!   "version": "1.2.0",
//!   "agentId": "agent-7",
//!   "entrypoint": "index.lua",
//!   "permissions": { "NETWORK_READ": true, "FILE_READ": false },
//!   "timeout": 2000
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use skillproof_config::{MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};
use skillproof_permissions::{Capability, PermissionMask};

use crate::error::AuditError;

/// Keys a manifest document may carry.
const MANIFEST_FIELDS: [&str; 6] = [
    "name",
    "version",
    "agentId",
    "entrypoint",
    "permissions",
    "timeout",
];

/// A skill's self-declared identity and capability set.
///
/// # Example
///
/// ```
/// use skillproof_auditor::SkillManifest;
/// use skillproof_permissions::Capability;
///
/// let manifest = SkillManifest::new("weather", "1.0.0", "agent-7", "index.lua")
///     .with_permission(Capability::NetworkRead, true)
///     .with_timeout_ms(2_000);
/// assert!(manifest.validate().is_ok());
/// assert_eq!(manifest.declared_mask().bits(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillManifest {
    name: String,
    version: String,
    agent_id: String,
    entrypoint: PathBuf,
    permissions: BTreeMap<Capability, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

impl SkillManifest {
    /// Creates a manifest with no declared permissions and no deadline
    /// override.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        agent_id: impl Into<String>,
        entrypoint: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            agent_id: agent_id.into(),
            entrypoint: entrypoint.into(),
            permissions: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Declares (or explicitly withholds) a capability.
    #[must_use]
    pub fn with_permission(mut self, capability: Capability, enabled: bool) -> Self {
        self.permissions.insert(capability, enabled);
        self
    }

    /// Overrides the run deadline, in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    /// Loads and validates a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ManifestNotFound`] for a missing file,
    /// [`AuditError::ManifestRead`] for an unreadable one,
    /// [`AuditError::ManifestParse`] for malformed JSON and
    /// [`AuditError::ManifestInvalid`] listing every schema violation.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                AuditError::ManifestNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                AuditError::ManifestRead {
                    path: path.to_path_buf(),
                    source: Arc::new(source),
                }
            }
        })?;
        Self::from_json(&text).map_err(|error| match error {
            AuditError::ManifestParse { message, .. } => AuditError::ManifestParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parses and validates a manifest from JSON text.
    ///
    /// Every problem in the document is collected: wrong or missing fields,
    /// unknown keys, unknown capabilities and out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ManifestParse`] when the text is not JSON and
    /// [`AuditError::ManifestInvalid`] listing every schema violation.
    pub fn from_json(text: &str) -> Result<Self, AuditError> {
        let document: Value =
            serde_json::from_str(text).map_err(|error| AuditError::ManifestParse {
                path: PathBuf::new(),
                message: error.to_string(),
            })?;
        let Value::Object(fields) = document else {
            return Err(AuditError::ManifestInvalid {
                errors: vec![String::from("manifest must be a JSON object")],
            });
        };

        let mut errors: Vec<String> = fields
            .keys()
            .filter(|key| !MANIFEST_FIELDS.contains(&key.as_str()))
            .map(|key| format!("unknown field '{key}'"))
            .collect();
        let name = string_field(&fields, "name", name_violation, &mut errors);
        let version = string_field(&fields, "version", version_violation, &mut errors);
        let agent_id = string_field(&fields, "agentId", agent_violation, &mut errors);
        let entrypoint = string_field(&fields, "entrypoint", entrypoint_violation, &mut errors);
        let permissions = permissions_field(&fields, &mut errors);
        let timeout = timeout_field(&fields, &mut errors);

        let manifest = Self {
            name: name.unwrap_or_default(),
            version: version.unwrap_or_default(),
            agent_id: agent_id.unwrap_or_default(),
            entrypoint: PathBuf::from(entrypoint.unwrap_or_default()),
            permissions: permissions.unwrap_or_default(),
            timeout,
        };
        if errors.is_empty() {
            Ok(manifest)
        } else {
            Err(AuditError::ManifestInvalid { errors })
        }
    }

    /// Checks the manifest against the schema rules.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ManifestInvalid`] listing every violation.
    pub fn validate(&self) -> Result<(), AuditError> {
        let errors = self.violations();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuditError::ManifestInvalid { errors })
        }
    }

    fn violations(&self) -> Vec<String> {
        [
            name_violation(&self.name),
            version_violation(&self.version),
            agent_violation(&self.agent_id),
            entrypoint_violation(&self.entrypoint.to_string_lossy()),
            self.timeout.and_then(timeout_violation),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Returns the skill name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the skill version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the agent the skill belongs to.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Returns the entrypoint, relative to the manifest directory.
    #[must_use]
    pub fn entrypoint(&self) -> &Path {
        &self.entrypoint
    }

    /// Returns the declared permission flags.
    #[must_use]
    pub const fn permissions(&self) -> &BTreeMap<Capability, bool> {
        &self.permissions
    }

    /// Returns the declared mask built from enabled permissions.
    #[must_use]
    pub fn declared_mask(&self) -> PermissionMask {
        PermissionMask::from_flags(&self.permissions)
    }

    /// Returns the run deadline override.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

fn name_violation(name: &str) -> Option<String> {
    name.trim()
        .is_empty()
        .then(|| String::from("name must not be empty"))
}

fn version_violation(version: &str) -> Option<String> {
    (!has_semver_prefix(version))
        .then(|| format!("version '{version}' must start with MAJOR.MINOR.PATCH"))
}

fn agent_violation(agent_id: &str) -> Option<String> {
    agent_id
        .trim()
        .is_empty()
        .then(|| String::from("agentId must not be empty"))
}

fn entrypoint_violation(entrypoint: &str) -> Option<String> {
    entrypoint
        .is_empty()
        .then(|| String::from("entrypoint must not be empty"))
}

fn timeout_violation(timeout: u64) -> Option<String> {
    (!(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout)).then(|| {
        format!(
            "timeout {timeout} must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} milliseconds"
        )
    })
}

/// Reads a required string field, recording type and content violations.
fn string_field(
    fields: &Map<String, Value>,
    key: &str,
    check: fn(&str) -> Option<String>,
    errors: &mut Vec<String>,
) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(text)) => {
            errors.extend(check(text));
            Some(text.clone())
        }
        Some(_) => {
            errors.push(format!("{key} must be a string"));
            None
        }
        None => {
            errors.push(format!("missing required field '{key}'"));
            None
        }
    }
}

fn permissions_field(
    fields: &Map<String, Value>,
    errors: &mut Vec<String>,
) -> Option<BTreeMap<Capability, bool>> {
    let entries = match fields.get("permissions") {
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            errors.push(String::from("permissions must be an object"));
            return None;
        }
        None => {
            errors.push(String::from("missing required field 'permissions'"));
            return None;
        }
    };
    let mut permissions = BTreeMap::new();
    for (name, flag) in entries {
        match (name.parse::<Capability>(), flag) {
            (Err(error), _) => errors.push(format!("permissions: {error}")),
            (Ok(capability), Value::Bool(enabled)) => {
                permissions.insert(capability, *enabled);
            }
            (Ok(_), _) => errors.push(format!("permission '{name}' must be a boolean")),
        }
    }
    Some(permissions)
}

fn timeout_field(fields: &Map<String, Value>, errors: &mut Vec<String>) -> Option<u64> {
    match fields.get("timeout") {
        None => None,
        Some(Value::Number(number)) => {
            let millis = number.as_u64();
            match millis {
                Some(value) => errors.extend(timeout_violation(value)),
                None => errors.push(format!(
                    "timeout {number} must be a whole number of milliseconds"
                )),
            }
            millis
        }
        Some(_) => {
            errors.push(String::from("timeout must be a number"));
            None
        }
    }
}

/// Returns `true` when `version` begins with three dot-separated digit runs.
fn has_semver_prefix(version: &str) -> bool {
    let mut parts = version.splitn(3, '.');
    let is_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    let major = parts.next().is_some_and(is_digits);
    let minor = parts.next().is_some_and(is_digits);
    let patch = parts
        .next()
        .is_some_and(|rest| rest.chars().next().is_some_and(|c| c.is_ascii_digit()));
    major && minor && patch
}

#[cfg(test)]
mod tests;
