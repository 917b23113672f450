//! `crontopus-agent config`: show the effective configuration.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Print the configuration file path
    Path,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the config path cannot be determined.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    let path = app.config_store.path()?;
    match cmd {
        ConfigCommand::Show => app.renderer().render_config(&app.config, &path)?,
        ConfigCommand::Path => app.renderer().render_path(&path)?,
    }
    Ok(ExitCode::SUCCESS)
}
