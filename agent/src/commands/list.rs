//! `crontopus-agent list`: show managed jobs.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;

/// Run the list command.
///
/// # Errors
///
/// Returns an error if the native scheduler cannot be read.
pub async fn run<S: NativeStore>(app: &AppContext, engine: &SerializedEngine<S>) -> Result<ExitCode> {
    let entries = engine.list().await.context("cannot list managed jobs")?;
    app.renderer().render_entries(&entries)?;
    Ok(ExitCode::SUCCESS)
}
