//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - `Cli` - Main CLI entry point
//! - `Commands` - Available subcommands

use crate::commands::config::ConfigAction;
use crate::commands::snapshot::SnapshotAction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browse a directory the way a file explorer sidebar shows it.
///
/// Directories load lazily, single-child chains can be folded with
/// `--compact`, and expanded state can persist between runs.
#[derive(Parser, Debug)]
#[command(name = "filetree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    pub format: String,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "FILETREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fold chains of single-child directories
    #[arg(long, global = true)]
    pub compact: bool,

    /// Height of the viewport, in rows
    #[arg(long, global = true)]
    pub rows: Option<u32>,

    /// Directory holding persisted tree snapshots
    #[arg(long, global = true, env = "FILETREE_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the visible tree of a directory.
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Top level only
    /// filetree tree .
    ///
    /// # Three levels, folded, restoring the last session
    /// filetree tree ~/project --depth 3 --compact --session
    /// ```
    Tree {
        /// Workspace directory
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Expand directories down to this level
        #[arg(short, long)]
        depth: Option<usize>,

        /// Restore expanded directories from the last session and save them back
        #[arg(short, long)]
        session: bool,
    },

    /// Reveal and select a path, expanding its ancestors.
    ///
    /// # Examples
    ///
    /// ```bash
    /// filetree locate src/engine/mod.rs --root ~/project
    /// ```
    Locate {
        /// Path to reveal, absolute or relative to the workspace
        target: String,

        /// Workspace directory
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Restore expanded directories from the last session and save them back
        #[arg(short, long)]
        session: bool,
    },

    /// Inspect or clear persisted tree snapshots.
    Snapshot {
        /// Snapshot action
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Show or initialize the configuration.
    Config {
        /// Configuration action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_tree_defaults() {
        let cli = Cli::parse_from(["filetree", "tree"]);
        if let Commands::Tree {
            root,
            depth,
            session,
        } = cli.command
        {
            assert_eq!(root, PathBuf::from("."));
            assert_eq!(depth, None);
            assert!(!session);
        } else {
            panic!("Expected Tree command");
        }
        assert_eq!(cli.format, "pretty");
        assert!(!cli.compact);
    }

    #[test]
    fn test_cli_parsing_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "filetree",
            "tree",
            "/w",
            "--depth",
            "2",
            "--compact",
            "--format",
            "json",
            "-v",
            "--rows",
            "20",
        ]);
        assert!(cli.verbose);
        assert!(cli.compact);
        assert_eq!(cli.format, "json");
        assert_eq!(cli.rows, Some(20));
        assert!(matches!(cli.command, Commands::Tree { depth: Some(2), .. }));
    }

    #[test]
    fn test_cli_parsing_locate() {
        let cli = Cli::parse_from(["filetree", "locate", "src/lib.rs", "--root", "/w", "-s"]);
        if let Commands::Locate {
            target,
            root,
            session,
        } = cli.command
        {
            assert_eq!(target, "src/lib.rs");
            assert_eq!(root, PathBuf::from("/w"));
            assert!(session);
        } else {
            panic!("Expected Locate command");
        }
    }

    #[test]
    fn test_cli_parsing_snapshot_clear() {
        let cli = Cli::parse_from([
            "filetree",
            "snapshot",
            "clear",
            "/w",
            "--snapshot-dir",
            "/tmp/snaps",
        ]);
        assert_eq!(cli.snapshot_dir, Some(PathBuf::from("/tmp/snaps")));
        assert!(matches!(
            cli.command,
            Commands::Snapshot {
                action: SnapshotAction::Clear { .. }
            }
        ));
    }

    #[test]
    fn test_cli_parsing_config_show() {
        let cli = Cli::parse_from(["filetree", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["filetree", "watch"]).is_err());
    }
}
