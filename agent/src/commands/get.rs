//! `crontopus-agent get <id>`: check whether a job is installed.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Job id
    pub id: String,
}

/// Run the get command. Exits with status 1 when the job is not installed.
///
/// # Errors
///
/// Returns an error if the native scheduler cannot be read.
pub async fn run<S: NativeStore>(
    app: &AppContext,
    engine: &SerializedEngine<S>,
    args: &GetArgs,
) -> Result<ExitCode> {
    let entry = engine
        .get(&args.id)
        .await
        .with_context(|| format!("cannot look up '{}'", args.id))?;
    app.renderer().render_entry(entry.as_ref(), &args.id)?;
    Ok(if entry.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
