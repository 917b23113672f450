//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::AddOutcome;
use crate::domain::config::{AgentConfig, CONFIG_ENV};
use crate::domain::job::{DiscoveredJob, JobEntry};
use crate::domain::reconcile::{ReconcilePlan, ReconcileReport};
use crate::output::OutputContext;

/// Renders results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn render_entries(&self, entries: &[JobEntry]) {
        if entries.is_empty() {
            if !self.ctx.quiet {
                println!("No managed jobs installed.");
            }
            return;
        }
        for entry in entries {
            println!(
                "  {:<24} {:<16} {}",
                entry.id.style(self.ctx.styles.id),
                entry.schedule,
                entry.command
            );
            if entry.name != entry.id {
                println!("  {:<24} {}", "", entry.name.style(self.ctx.styles.dim));
            }
        }
    }

    pub(crate) fn render_entry(&self, entry: Option<&JobEntry>, id: &str) {
        match entry {
            Some(entry) => {
                self.ctx.kv("id:      ", &entry.id);
                self.ctx.kv("name:    ", &entry.name);
                self.ctx.kv("schedule:", &entry.schedule);
                self.ctx.kv("command: ", &entry.command);
            }
            None => self.ctx.warn(&format!("Job '{id}' is not installed")),
        }
    }

    pub(crate) fn render_added(&self, entry: &JobEntry, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Created => self.ctx.success(&format!("Installed '{}'", entry.id)),
            AddOutcome::Updated => self.ctx.success(&format!("Updated '{}'", entry.id)),
            AddOutcome::Unchanged => {
                self.ctx.info(&format!("'{}' is already up to date", entry.id));
            }
        }
    }

    pub(crate) fn render_removed(&self, id: &str, removed: bool) {
        if removed {
            self.ctx.success(&format!("Removed '{id}'"));
        } else {
            self.ctx.info(&format!("'{id}' was not installed"));
        }
    }

    pub(crate) fn render_plan(&self, plan: &ReconcilePlan) {
        for anomaly in &plan.anomalies {
            self.ctx.warn(&anomaly.to_string());
        }
        if !plan.has_drift() {
            self.ctx
                .success(&format!("In sync ({} jobs unchanged)", plan.unchanged));
            return;
        }
        self.ctx.header("Planned changes:");
        for id in &plan.delete {
            self.change('-', id, self.ctx.styles.error);
        }
        for entry in &plan.update {
            self.change('~', &entry.id, self.ctx.styles.warning);
        }
        for entry in &plan.create {
            self.change('+', &entry.id, self.ctx.styles.success);
        }
        self.ctx.kv("unchanged:", &plan.unchanged.to_string());
    }

    pub(crate) fn render_report(&self, report: &ReconcileReport) {
        for anomaly in &report.anomalies {
            self.ctx.warn(&anomaly.to_string());
        }
        for id in &report.deleted {
            self.change('-', id, self.ctx.styles.error);
        }
        for id in &report.updated {
            self.change('~', id, self.ctx.styles.warning);
        }
        for id in &report.created {
            self.change('+', id, self.ctx.styles.success);
        }
        for failure in &report.failures {
            self.ctx.error(&format!(
                "{} '{}' failed: {}",
                failure.operation, failure.id, failure.error
            ));
        }
        let summary = format!(
            "{} created, {} updated, {} deleted, {} unchanged",
            report.created.len(),
            report.updated.len(),
            report.deleted.len(),
            report.unchanged
        );
        if report.is_success() {
            self.ctx.success(&summary);
        } else {
            self.ctx
                .warn(&format!("{summary}, {} failed", report.failures.len()));
        }
    }

    pub(crate) fn render_discovered(&self, jobs: &[DiscoveredJob]) {
        if jobs.is_empty() {
            if !self.ctx.quiet {
                println!("No unmanaged jobs found.");
            }
            return;
        }
        for job in jobs {
            println!(
                "  {:<24} {:<16} {}",
                job.name.style(self.ctx.styles.dim),
                job.schedule,
                job.command
            );
        }
    }

    pub(crate) fn render_config(&self, config: &AgentConfig, path: &Path) {
        let scheduler = &config.scheduler;
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<36} {}", "scheduler.backend:", scheduler.backend);
        println!("  {:<36} {}", "scheduler.command_timeout_secs:", scheduler.command_timeout_secs);
        println!("  {:<36} {}", "scheduler.crontab_program:", scheduler.crontab_program);
        println!("  {:<36} {}", "scheduler.task_folder:", scheduler.task_folder);
        println!("  {:<36} {}", "scheduler.verify_before_write:", scheduler.verify_before_write);
        println!(
            "  {:<36} {}",
            "manifests.path:",
            config
                .manifests
                .path
                .as_ref()
                .map_or_else(|| "(default)".to_string(), |p| p.display().to_string())
        );
        println!("  {:<36} {}", "manifests.sync_interval_secs:", config.manifests.sync_interval_secs);
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        println!(
            "    {:<18} {}",
            format!("{CONFIG_ENV}:"),
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| "(not set)".to_string())
        );
        println!(
            "    {:<18} {}",
            "RUST_LOG:",
            std::env::var("RUST_LOG").unwrap_or_else(|_| "(not set)".to_string())
        );
        println!();
    }

    fn change(&self, sign: char, id: &str, style: owo_colors::Style) {
        if !self.ctx.quiet {
            println!("  {} {id}", sign.style(style));
        }
    }
}
