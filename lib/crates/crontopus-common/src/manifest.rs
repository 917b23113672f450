// lib/crates/crontopus-common/src/manifest.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::JobEntry;

/// Supported manifest `apiVersion`.
pub const API_VERSION: &str = "v1";
/// Supported manifest `kind`.
pub const KIND: &str = "Job";
/// Namespace used for manifests placed directly in the manifest root.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("apiVersion is required")]
    MissingApiVersion,
    #[error("unsupported apiVersion: {0} (only v1 is supported)")]
    UnsupportedApiVersion(String),
    #[error("unsupported kind: {0} (only Job is supported)")]
    UnsupportedKind(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("metadata.name must be 63 characters or less")]
    NameTooLong,
}

/// Job manifest (`<namespace>/<job>.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobManifest {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ManifestMetadata,
    pub spec: ManifestSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    /// Stable job identity. Derived from namespace and name when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSpec {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub paused: Option<bool>,
}

impl JobManifest {
    /// Structural validation of a parsed manifest.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.api_version.is_empty() {
            return Err(ManifestError::MissingApiVersion);
        }
        if self.api_version != API_VERSION {
            return Err(ManifestError::UnsupportedApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ManifestError::UnsupportedKind(self.kind.clone()));
        }
        if self.metadata.name.is_empty() {
            return Err(ManifestError::MissingField("metadata.name"));
        }
        if self.metadata.name.len() > 63 {
            return Err(ManifestError::NameTooLong);
        }
        if self.spec.schedule.trim().is_empty() {
            return Err(ManifestError::MissingField("spec.schedule"));
        }
        if self.spec.command.trim().is_empty() {
            return Err(ManifestError::MissingField("spec.command"));
        }
        Ok(())
    }

    /// Enabled and not paused. Both flags default to schedulable.
    #[must_use]
    pub fn should_schedule(&self) -> bool {
        self.spec.enabled.unwrap_or(true) && !self.spec.paused.unwrap_or(false)
    }

    /// Command followed by its arguments, space separated.
    #[must_use]
    pub fn full_command(&self) -> String {
        if self.spec.args.is_empty() {
            return self.spec.command.clone();
        }
        let mut parts = vec![self.spec.command.as_str()];
        parts.extend(self.spec.args.iter().map(String::as_str));
        parts.join(" ")
    }

    /// Identity used in the native store.
    #[must_use]
    pub fn job_id(&self, namespace: &str) -> String {
        match &self.metadata.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{namespace}.{}", self.metadata.name),
        }
    }

    #[must_use]
    pub fn to_entry(&self, namespace: &str) -> JobEntry {
        JobEntry {
            id: self.job_id(namespace),
            name: self.metadata.name.clone(),
            schedule: self.spec.schedule.clone(),
            command: self.full_command(),
        }
    }
}
