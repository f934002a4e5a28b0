//! Command implementations for the filetree CLI.
//!
//! Each command module opens what it needs through [`CommandContext`],
//! runs its operation and formats the result according to the requested
//! output format.

pub mod common;
pub mod config;
pub mod locate;
pub mod snapshot;
pub mod tree;

use crate::cli::Cli;
use crate::output::OutputFormat;
use anyhow::Result;
use filetree_core::traits::SnapshotStorage;
use filetree_core::{MemorySnapshotStorage, TreeConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Effective engine configuration
    pub config: TreeConfig,
    /// Override of the snapshot directory
    pub snapshot_dir: Option<PathBuf>,
    /// Output format
    pub format: OutputFormat,
}

impl CommandContext {
    /// Builds the context from parsed arguments.
    ///
    /// Command-line flags override the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the output format is unknown or the
    /// configuration cannot be loaded.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let format = cli
            .format
            .parse::<OutputFormat>()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let mut config = crate::config::load_config(cli.config.as_deref())?;
        if cli.compact {
            config.compact_folders = true;
        }
        if let Some(rows) = cli.rows {
            config.viewport_height = f64::from(rows) * config.item_height;
        }

        Ok(Self {
            config,
            snapshot_dir: cli.snapshot_dir.clone(),
            format,
        })
    }

    /// Snapshot storage for a run.
    ///
    /// Sessions persist to disk; otherwise nothing outlives the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot directory cannot be determined.
    pub fn storage(&self, session: bool) -> Result<Arc<dyn SnapshotStorage>> {
        if session {
            Ok(Arc::new(common::snapshot_storage(
                self.snapshot_dir.as_deref(),
            )?))
        } else {
            Ok(Arc::new(MemorySnapshotStorage::new()))
        }
    }
}
