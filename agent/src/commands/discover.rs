//! `crontopus-agent discover`: list jobs the agent does not manage.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;

/// Run the discover command.
///
/// # Errors
///
/// Returns an error if the native scheduler cannot be read.
pub async fn run<S: NativeStore>(app: &AppContext, engine: &SerializedEngine<S>) -> Result<ExitCode> {
    let jobs = engine
        .discover()
        .await
        .context("cannot read the native scheduler")?;
    app.renderer().render_discovered(&jobs)?;
    Ok(ExitCode::SUCCESS)
}
