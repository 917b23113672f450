//! `crontopus-agent remove <id>`: delete one managed job.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Job id
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Run the remove command. Removing a job that is not installed succeeds.
///
/// # Errors
///
/// Returns an error if the native scheduler cannot be read or rewritten.
pub async fn run<S: NativeStore>(
    app: &AppContext,
    engine: &SerializedEngine<S>,
    args: &RemoveArgs,
) -> Result<ExitCode> {
    if !args.yes && !app.confirm(&format!("Remove job '{}'?", args.id), true)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    let removed = engine
        .remove(&args.id)
        .await
        .with_context(|| format!("cannot remove '{}'", args.id))?;
    app.renderer().render_removed(&args.id, removed)?;
    Ok(ExitCode::SUCCESS)
}
