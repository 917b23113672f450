//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::fmt::Debug;
use std::path::PathBuf;

use anyhow::Result;

use crate::domain::config::AgentConfig;
use crate::domain::error::{CommandError, SchedulerError};
use crate::domain::job::{DiscoveredJob, JobEntry};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts native process execution so the engine can be driven without a
/// real scheduler.
///
/// Implementations must bound every invocation with a timeout and kill the
/// child when it fires.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and return its standard output.
    ///
    /// # Errors
    ///
    /// `CommandError::NonZeroExit` carries the exit code and combined
    /// stdout+stderr; `CommandError::Spawn` means the program never ran.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, CommandError>;

    /// Run a program with `stdin` piped to it.
    ///
    /// # Errors
    ///
    /// Same as [`CommandRunner::run`].
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
    ) -> Result<Vec<u8>, CommandError>;
}

impl<T: CommandRunner> CommandRunner for &T {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        (**self).run(program, args).await
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
    ) -> Result<Vec<u8>, CommandError> {
        (**self).run_with_stdin(program, args, stdin).await
    }
}

// ── Native Store Port ─────────────────────────────────────────────────────────

/// One read of a native store.
///
/// `layout` is whatever the store needs to write back without disturbing
/// foreign content (the ordered crontab lines, the task paths in the managed
/// folder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<L> {
    /// Managed entries in native order.
    pub managed: Vec<JobEntry>,
    pub layout: L,
    /// Foreign entries that resemble a managed marker.
    pub ambiguous: Vec<String>,
}

/// The only component that touches the native scheduler's configuration.
#[allow(async_fn_in_trait)]
pub trait NativeStore {
    type Layout: Clone + PartialEq + Debug;

    /// Short human name for logs, e.g. `crontab`.
    fn name(&self) -> &'static str;

    /// Reject entries this store cannot represent faithfully.
    ///
    /// Runs before any native command is invoked.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidEntry`.
    fn validate(&self, entry: &JobEntry) -> Result<(), SchedulerError>;

    /// Read the whole store.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` when the native tool cannot run, otherwise the
    /// mapped native failure.
    async fn read(&self) -> Result<Snapshot<Self::Layout>, SchedulerError>;

    /// Replace the managed set with `managed`, leaving foreign content as it
    /// was in `base`.
    ///
    /// # Errors
    ///
    /// Returns the native rejection with its raw diagnostic.
    async fn write(
        &self,
        managed: &[JobEntry],
        base: &Snapshot<Self::Layout>,
    ) -> Result<(), SchedulerError>;

    /// Foreign entries that look like scheduled jobs. Read-only.
    ///
    /// # Errors
    ///
    /// Same as [`NativeStore::read`].
    async fn discover(&self) -> Result<Vec<DiscoveredJob>, SchedulerError>;
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts configuration file access.
pub trait ConfigStore {
    /// Load the configuration, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<AgentConfig>;

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
