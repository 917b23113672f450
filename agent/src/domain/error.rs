//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Command errors ────────────────────────────────────────────────────────────

/// Failure of a single native command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started at all (missing, not executable).
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    ///
    /// `code` is `-1` when the process was terminated by a signal.
    #[error("{program} exited with status {code}: {}", .output.trim())]
    NonZeroExit {
        program: String,
        code: i32,
        output: String,
    },

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
}

impl CommandError {
    /// Exit code and combined output for a non-zero exit, `None` otherwise.
    #[must_use]
    pub fn exit_status(&self) -> Option<(i32, &str)> {
        match self {
            Self::NonZeroExit { code, output, .. } => Some((*code, output.as_str())),
            _ => None,
        }
    }
}

// ── Scheduler errors ──────────────────────────────────────────────────────────

/// Errors surfaced by the reconciliation engine and native store adapters.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Rejected before any native tool was invoked.
    #[error("invalid job '{id}': {reason}")]
    InvalidEntry { id: String, reason: String },

    /// The native store holds more than one managed entry with this id.
    #[error("job '{id}' is managed more than once in the native scheduler; refusing to overwrite")]
    Conflict { id: String },

    /// The native tool refused the configuration. Output is passed through unmodified.
    #[error("{program} rejected the change (exit {code}): {}", .output.trim())]
    NativeRejection {
        program: String,
        code: i32,
        output: String,
    },

    /// The native tool cannot be run at all. No entry-level operation can proceed.
    #[error("native scheduler unavailable ({program}): {reason}")]
    Unavailable { program: String, reason: String },

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    /// The native store changed between read and write.
    #[error("native scheduler was modified externally during this operation; retry")]
    ConcurrentModification,

    /// Native output could not be interpreted.
    #[error("unreadable native scheduler output: {0}")]
    Malformed(String),
}

impl SchedulerError {
    pub(crate) fn invalid(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` when retrying other entries in the same pass is pointless.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<CommandError> for SchedulerError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Spawn { program, source } => Self::Unavailable {
                program,
                reason: source.to_string(),
            },
            CommandError::NonZeroExit {
                program,
                code,
                output,
            } => Self::NativeRejection {
                program,
                code,
                output,
            },
            CommandError::TimedOut { program, secs } => Self::TimedOut { program, secs },
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to agent configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\n{hint}")]
    InvalidValue {
        key: String,
        value: String,
        hint: String,
    },
}
