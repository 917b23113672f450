//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::application::ports::NativeStore;
use crate::application::services::{ReconciliationEngine, SerializedEngine};
use crate::commands;
use crate::domain::config::SchedulerBackend;
use crate::infra::{CrontabStore, TaskSchedulerStore, TokioCommandRunner};

/// Reconcile declarative jobs against the host's native scheduler
#[derive(Parser)]
#[command(
    name = "crontopus-agent",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.crontopus/config.yaml)
    #[arg(long, global = true, env = "CRONTOPUS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List managed jobs
    List,

    /// Show one managed job
    Get(commands::get::GetArgs),

    /// Install or replace a job
    Add(commands::add::AddArgs),

    /// Remove a managed job
    Remove(commands::remove::RemoveArgs),

    /// Converge the native scheduler onto the manifest directory
    Reconcile(commands::reconcile::ReconcileArgs),

    /// List jobs not managed by the agent
    Discover,

    /// Run the reconcile loop
    Run(commands::run::RunArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command
    /// fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            config,
            command,
        } = self;
        if matches!(command, Command::Version) {
            return Ok(commands::version::run(json));
        }

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        })?;

        let scheduler = &app.config.scheduler;
        let runner = TokioCommandRunner::new(scheduler.command_timeout());
        match scheduler.backend.resolve() {
            SchedulerBackend::TaskScheduler => {
                let store = TaskSchedulerStore::with_folder(runner, &scheduler.task_folder);
                dispatch(&app, store, &command).await
            }
            SchedulerBackend::Auto | SchedulerBackend::Cron => {
                let store = CrontabStore::with_program(runner, &scheduler.crontab_program);
                dispatch(&app, store, &command).await
            }
        }
    }
}

async fn dispatch<S: NativeStore>(app: &AppContext, store: S, command: &Command) -> Result<ExitCode> {
    let engine = SerializedEngine::new(ReconciliationEngine::with_options(
        store,
        app.engine_options(),
    ));
    match command {
        Command::List => commands::list::run(app, &engine).await,
        Command::Get(args) => commands::get::run(app, &engine, args).await,
        Command::Add(args) => commands::add::run(app, &engine, args).await,
        Command::Remove(args) => commands::remove::run(app, &engine, args).await,
        Command::Reconcile(args) => commands::reconcile::run(app, &engine, args).await,
        Command::Discover => commands::discover::run(app, &engine).await,
        Command::Run(args) => commands::run::run(app, &engine, args).await,
        Command::Config(cmd) => commands::config::run(app, cmd),
        Command::Version => Ok(commands::version::run(app.is_json())),
    }
}
