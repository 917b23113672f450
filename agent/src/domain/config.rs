//! Domain types and validators for agent configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_CRONTAB_PROGRAM: &str = "crontab";
pub const DEFAULT_TASK_FOLDER: &str = "\\Crontopus\\";
/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "CRONTOPUS_CONFIG";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.crontopus/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub scheduler: SchedulerConfig,
    pub manifests: ManifestConfig,
}

/// Which native scheduler the agent drives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerBackend {
    /// Cron on Unix-like hosts, Task Scheduler on Windows.
    #[default]
    Auto,
    Cron,
    TaskScheduler,
}

impl SchedulerBackend {
    /// Resolve `Auto` for the host platform.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::TaskScheduler,
            Self::Auto => Self::Cron,
            other => other,
        }
    }
}

impl std::fmt::Display for SchedulerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Cron => "cron",
            Self::TaskScheduler => "task-scheduler",
        })
    }
}

/// Native scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub backend: SchedulerBackend,
    /// Upper bound on every native command invocation.
    pub command_timeout_secs: u64,
    pub crontab_program: String,
    /// Task Scheduler folder holding managed tasks, e.g. `\Crontopus\`.
    pub task_folder: String,
    /// Re-read the native store before committing and abort if it changed.
    pub verify_before_write: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backend: SchedulerBackend::default(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            crontab_program: DEFAULT_CRONTAB_PROGRAM.to_string(),
            task_folder: DEFAULT_TASK_FOLDER.to_string(),
            verify_before_write: true,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Local manifest directory settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest root. `None` means `~/.crontopus/job-manifests`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub sync_interval_secs: u64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
        }
    }
}

impl ManifestConfig {
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns an error naming the first invalid key.
pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.scheduler.command_timeout_secs == 0 {
        return Err(invalid(
            "scheduler.command_timeout_secs",
            "0",
            "Use a timeout of at least 1 second.",
        ));
    }
    if config.scheduler.crontab_program.trim().is_empty() {
        return Err(invalid(
            "scheduler.crontab_program",
            &config.scheduler.crontab_program,
            "Set the crontab executable name or path, e.g. `crontab`.",
        ));
    }
    let folder = &config.scheduler.task_folder;
    if !folder.starts_with('\\') || !folder.ends_with('\\') || folder.len() < 3 {
        return Err(invalid(
            "scheduler.task_folder",
            folder,
            "Use a Task Scheduler folder path with leading and trailing backslashes, e.g. `\\Crontopus\\`.",
        ));
    }
    if config.manifests.sync_interval_secs == 0 {
        return Err(invalid(
            "manifests.sync_interval_secs",
            "0",
            "Use an interval of at least 1 second.",
        ));
    }
    Ok(())
}

fn invalid(key: &str, value: &str, hint: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
