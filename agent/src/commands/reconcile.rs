//! `crontopus-agent reconcile`: converge the native scheduler onto the
//! local manifest directory once.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;
use crate::infra::{config, manifests};

/// Arguments for the reconcile command.
#[derive(Args)]
pub struct ReconcileArgs {
    /// Manifest directory (defaults to `manifests.path`)
    #[arg(long)]
    pub manifests: Option<PathBuf>,

    /// Show the changes without applying them
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the reconcile command. Exits with status 1 if any job failed.
///
/// # Errors
///
/// Returns an error if the manifests cannot be loaded or the native
/// scheduler is unavailable.
pub async fn run<S: NativeStore>(
    app: &AppContext,
    engine: &SerializedEngine<S>,
    args: &ReconcileArgs,
) -> Result<ExitCode> {
    let dir = config::manifest_dir(&app.config, args.manifests.as_deref())?;
    let desired = manifests::load_desired(&dir)?;

    if args.dry_run {
        let plan = engine.plan(&desired).await.context("cannot plan changes")?;
        app.renderer().render_plan(&plan)?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = engine
        .reconcile(&desired)
        .await
        .context("reconcile aborted")?;
    app.renderer().render_report(&report)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
