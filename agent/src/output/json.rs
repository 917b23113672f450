//! JSON output helpers.
//!
//! Every `--json` result is one pretty-printed object on stdout. Failures use
//! the error object from [`format_error`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::AddOutcome;
use crate::domain::config::AgentConfig;
use crate::domain::error::SchedulerError;
use crate::domain::job::{DiscoveredJob, JobEntry};
use crate::domain::reconcile::{ReconcilePlan, ReconcileReport};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for a failed command.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    let scheduler = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SchedulerError>());
    match scheduler {
        Some(SchedulerError::InvalidEntry { .. }) => "INVALID_JOB",
        Some(SchedulerError::Conflict { .. }) => "DUPLICATE_MANAGED_JOB",
        Some(SchedulerError::NativeRejection { .. }) => "NATIVE_REJECTION",
        Some(SchedulerError::Unavailable { .. }) => "SCHEDULER_UNAVAILABLE",
        Some(SchedulerError::TimedOut { .. }) => "TIMED_OUT",
        Some(SchedulerError::ConcurrentModification) => "CONCURRENT_MODIFICATION",
        Some(SchedulerError::Malformed(_)) => "MALFORMED_NATIVE_STATE",
        None => "COMMAND_FAILED",
    }
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    pub(crate) fn render_entries(&self, entries: &[JobEntry]) -> Result<()> {
        print(&serde_json::json!({ "jobs": entries }))
    }

    pub(crate) fn render_entry(&self, entry: Option<&JobEntry>, id: &str) -> Result<()> {
        print(&serde_json::json!({ "id": id, "installed": entry.is_some(), "job": entry }))
    }

    pub(crate) fn render_added(&self, entry: &JobEntry, outcome: AddOutcome) -> Result<()> {
        print(&serde_json::json!({ "id": entry.id, "outcome": outcome.as_str() }))
    }

    pub(crate) fn render_removed(&self, id: &str, removed: bool) -> Result<()> {
        print(&serde_json::json!({ "id": id, "removed": removed }))
    }

    pub(crate) fn render_plan(&self, plan: &ReconcilePlan) -> Result<()> {
        print(&serde_json::json!({
            "dry_run": true,
            "drift": plan.has_drift(),
            "create": plan.create.iter().map(|e| &e.id).collect::<Vec<_>>(),
            "update": plan.update.iter().map(|e| &e.id).collect::<Vec<_>>(),
            "delete": plan.delete,
            "unchanged": plan.unchanged,
            "anomalies": plan.anomalies,
        }))
    }

    pub(crate) fn render_report(&self, report: &ReconcileReport) -> Result<()> {
        print(report)
    }

    pub(crate) fn render_discovered(&self, jobs: &[DiscoveredJob]) -> Result<()> {
        print(&serde_json::json!({ "jobs": jobs }))
    }

    pub(crate) fn render_config(&self, config: &AgentConfig, path: &Path) -> Result<()> {
        print(&serde_json::json!({ "path": path, "config": config }))
    }

    pub(crate) fn render_path(&self, path: &Path) -> Result<()> {
        print(&serde_json::json!({ "path": path }))
    }
}
