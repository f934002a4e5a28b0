//! Filetree CLI.
//!
//! Prints a directory the way a file explorer sidebar shows it, backed by
//! the lazily-loaded file tree engine.
//!
//! # Architecture
//!
//! The CLI is organized around subcommands:
//! - `tree` - Print the visible tree, optionally expanded to a depth
//! - `locate` - Reveal and select a path
//! - `snapshot` - Inspect or clear persisted tree state
//! - `config` - Show or initialize the configuration
//!
//! # Examples
//!
//! ```bash
//! # Two levels of the current directory, folding single-child chains
//! filetree tree --depth 2 --compact
//!
//! # Reveal a file in a 30-row viewport
//! filetree locate src/engine/mod.rs --rows 30
//! ```

use anyhow::Result;
use clap::Parser;
use filetree_cli::cli::{Cli, Commands};
use filetree_cli::commands::{self, CommandContext};
use filetree_cli::output::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let context = CommandContext::from_cli(&cli)?;
    let exit_code = execute_command(cli.command, &context).await?;

    std::process::exit(exit_code.as_i32());
}

/// Initializes logging infrastructure.
///
/// `--verbose` forces debug level; otherwise `RUST_LOG` applies, falling
/// back to info. Logs go to stderr so they never mix with command output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Routes a command to its handler.
///
/// # Errors
///
/// Returns an error if command execution fails.
async fn execute_command(command: Commands, context: &CommandContext) -> Result<ExitCode> {
    match command {
        Commands::Tree {
            root,
            depth,
            session,
        } => commands::tree::run(context, &root, depth, session).await,
        Commands::Locate {
            target,
            root,
            session,
        } => commands::locate::run(context, &root, &target, session).await,
        Commands::Snapshot { action } => commands::snapshot::run(context, action).await,
        Commands::Config { action } => commands::config::run(context, action),
    }
}
