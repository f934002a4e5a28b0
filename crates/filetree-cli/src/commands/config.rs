//! Config command implementation.

use super::CommandContext;
use crate::config::{default_config_path, save_config};
use crate::output::ExitCode;
use anyhow::{Context, Result};
use clap::Subcommand;
use filetree_core::TreeConfig;
use std::path::{Path, PathBuf};

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the default configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Target file, defaults to the platform config path
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Runs a config subcommand.
///
/// # Errors
///
/// Returns an error if the config path cannot be determined or written.
pub fn run(context: &CommandContext, action: ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let formatted = crate::formatters::format_output(&context.config, context.format)
                .context("failed to format configuration")?;
            println!("{formatted}");
        }
        ConfigAction::Path => println!("{}", default_config_path()?.display()),
        ConfigAction::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => default_config_path()?,
            };
            init(&path, force)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Writes the default configuration to `path`.
///
/// # Errors
///
/// Returns an error if the file exists and `force` is not set, or if it
/// cannot be written.
pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    save_config(path, &TreeConfig::default())
}
