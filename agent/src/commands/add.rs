//! `crontopus-agent add`: install or replace one job.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;
use crate::domain::job::JobEntry;

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Stable job id
    #[arg(long)]
    pub id: String,

    /// Native schedule, e.g. "*/5 * * * *"
    #[arg(long)]
    pub schedule: String,

    /// Human-readable name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,

    /// Command line to install
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

impl AddArgs {
    #[must_use]
    pub fn to_entry(&self) -> JobEntry {
        let entry = JobEntry::new(&self.id, &self.schedule, self.command.join(" "));
        match &self.name {
            Some(name) => entry.with_name(name),
            None => entry,
        }
    }
}

/// Run the add command.
///
/// # Errors
///
/// Returns an error if the job is invalid or the native scheduler rejects it.
pub async fn run<S: NativeStore>(
    app: &AppContext,
    engine: &SerializedEngine<S>,
    args: &AddArgs,
) -> Result<ExitCode> {
    let entry = args.to_entry();
    let outcome = engine
        .add(&entry)
        .await
        .with_context(|| format!("cannot install '{}'", entry.id))?;
    app.renderer().render_added(&entry, outcome)?;
    Ok(ExitCode::SUCCESS)
}
