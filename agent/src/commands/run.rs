//! `crontopus-agent run`: long-running reconcile loop.
//!
//! Reconciles once at startup, then on every interval tick when the plan
//! shows drift. On Unix, `SIGUSR1` forces an immediate pass. Ctrl-C or
//! `SIGTERM` stops the loop between passes.

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::app::AppContext;
use crate::application::ports::NativeStore;
use crate::application::services::SerializedEngine;
use crate::infra::{config, manifests};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Manifest directory (defaults to `manifests.path`)
    #[arg(long)]
    pub manifests: Option<PathBuf>,

    /// Seconds between passes (defaults to `manifests.sync_interval_secs`)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

/// Run the agent loop until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn run<S: NativeStore>(
    app: &AppContext,
    engine: &SerializedEngine<S>,
    args: &RunArgs,
) -> Result<ExitCode> {
    let dir = config::manifest_dir(&app.config, args.manifests.as_deref())?;
    let period = args
        .interval
        .map_or_else(|| app.config.manifests.sync_interval(), Duration::from_secs);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut trigger = ManualTrigger::new()?;
    let mut shutdown = pin!(shutdown_signal());

    info!(
        manifests = %dir.display(),
        interval_secs = period.as_secs(),
        backend = %app.config.scheduler.backend.resolve(),
        "agent started"
    );
    app.output.info(&format!(
        "Reconciling {} every {}s (Ctrl-C to stop)",
        dir.display(),
        period.as_secs()
    ));

    let mut first = true;
    loop {
        let forced = tokio::select! {
            _ = ticker.tick() => std::mem::take(&mut first),
            () = trigger.recv() => {
                info!("manual reconcile requested");
                true
            }
            () = &mut shutdown => break,
        };
        pass(engine, &dir, forced).await;
    }

    info!("agent stopped");
    Ok(ExitCode::SUCCESS)
}

/// One reconcile pass. Failures are logged; the next tick retries.
async fn pass<S: NativeStore>(engine: &SerializedEngine<S>, dir: &Path, forced: bool) {
    let desired = match manifests::load_desired(dir) {
        Ok(desired) => desired,
        Err(e) => {
            warn!(error = format!("{e:#}"), "cannot load manifests; skipping this pass");
            return;
        }
    };
    let result = if forced {
        engine.reconcile(&desired).await.map(Some)
    } else {
        engine.reconcile_if_drifted(&desired).await
    };
    match result {
        Ok(Some(report)) if report.is_success() => {
            info!(changes = report.changes(), "pass complete");
        }
        Ok(Some(report)) => {
            for failure in &report.failures {
                warn!(id = %failure.id, operation = %failure.operation, error = %failure.error, "job not converged");
            }
        }
        Ok(None) => {}
        Err(e) => error!(error = %e, "reconcile aborted"),
    }
}

/// Source of manual reconcile requests.
struct ManualTrigger {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl ManualTrigger {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use anyhow::Context as _;
        use tokio::signal::unix::{SignalKind, signal};
        let signal = signal(SignalKind::user_defined1()).context("cannot listen for SIGUSR1")?;
        Ok(Self { signal })
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    fn new() -> Result<Self> {
        Ok(Self {})
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if self.signal.recv().await.is_some() {
            return;
        }
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let terminate = async {
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    term.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            () = terminate => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
