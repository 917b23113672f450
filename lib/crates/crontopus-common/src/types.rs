use serde::{Deserialize, Serialize};

/// A scheduled job as the agent sees it, both desired (from manifests) and
/// observed (parsed back out of the native scheduler).
///
/// `command` never contains the ownership marker: adapters add it on write
/// and strip it on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobEntry {
    /// Stable identity assigned by the manifest source.
    pub id: String,
    /// Human-readable label; not used for matching.
    #[serde(default)]
    pub name: String,
    /// Native time expression (cron syntax, or trigger XML on Windows).
    pub schedule: String,
    pub command: String,
}

impl JobEntry {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        schedule: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            schedule: schedule.into(),
            command: command.into(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns `true` when `other` would install the same native entry.
    ///
    /// Only schedule and command are compared; the name is cosmetic.
    #[must_use]
    pub fn same_content(&self, other: &JobEntry) -> bool {
        self.schedule == other.schedule && self.command == other.command
    }
}

/// An entry found in the native scheduler that the agent does not own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveredJob {
    /// Task name on structured stores, or `line-<n>` for crontab lines.
    pub name: String,
    pub schedule: String,
    pub command: String,
}
