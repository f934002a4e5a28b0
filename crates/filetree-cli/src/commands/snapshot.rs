//! Snapshot command implementation.
//!
//! Shows or removes the persisted tree state of a workspace.

use super::CommandContext;
use super::common::{root_uri, snapshot_storage};
use crate::output::ExitCode;
use anyhow::{Context, Result};
use clap::Subcommand;
use filetree_core::traits::SnapshotStorage;
use filetree_core::{TreeSnapshot, WorkspaceId};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Snapshot subcommands.
#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// Show the stored snapshot of a workspace
    Show {
        /// Workspace directory
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Remove the stored snapshot of a workspace
    Clear {
        /// Workspace directory
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

/// Stored snapshot of one workspace.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SnapshotReport {
    /// Workspace identity
    pub workspace: String,
    /// Snapshot file
    pub file: String,
    /// Stored state, `None` if nothing was saved
    pub snapshot: Option<TreeSnapshot>,
}

/// Runs a snapshot subcommand.
///
/// # Errors
///
/// Returns an error if the workspace cannot be resolved or the storage fails.
pub async fn run(context: &CommandContext, action: SnapshotAction) -> Result<ExitCode> {
    match action {
        SnapshotAction::Show { root } => {
            let report = show(context, &root).await?;
            let formatted = crate::formatters::format_output(&report, context.format)
                .context("failed to format snapshot")?;
            println!("{formatted}");
            if report.snapshot.is_some() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::NOT_FOUND)
            }
        }
        SnapshotAction::Clear { root } => {
            let workspace = clear(context, &root).await?;
            println!("Cleared snapshot of {workspace}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads the stored snapshot of the workspace at `root`.
///
/// # Errors
///
/// Returns an error if the workspace cannot be resolved or the stored
/// snapshot is unreadable.
pub async fn show(context: &CommandContext, root: &Path) -> Result<SnapshotReport> {
    let workspace = WorkspaceId::from_uri(&root_uri(root).await?);
    let storage = snapshot_storage(context.snapshot_dir.as_deref())?;
    let snapshot = storage
        .load(&workspace)
        .await
        .context("failed to load snapshot")?;

    Ok(SnapshotReport {
        file: storage
            .directory()
            .join(format!("{}.json", workspace.storage_key()))
            .display()
            .to_string(),
        workspace: workspace.to_string(),
        snapshot,
    })
}

/// Removes the stored snapshot of the workspace at `root`.
///
/// # Errors
///
/// Returns an error if the workspace cannot be resolved or the storage fails.
pub async fn clear(context: &CommandContext, root: &Path) -> Result<WorkspaceId> {
    let workspace = WorkspaceId::from_uri(&root_uri(root).await?);
    snapshot_storage(context.snapshot_dir.as_deref())?
        .clear(&workspace)
        .await
        .context("failed to clear snapshot")?;
    tracing::info!(workspace = %workspace, "snapshot cleared");
    Ok(workspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tree;
    use crate::output::OutputFormat;
    use filetree_core::TreeConfig;

    fn context(snapshots: &Path) -> CommandContext {
        CommandContext {
            config: TreeConfig::default(),
            snapshot_dir: Some(snapshots.to_path_buf()),
            format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_show_after_session_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        let context = context(snapshots.path());

        let empty = show(&context, dir.path()).await.unwrap();
        assert!(empty.snapshot.is_none());

        tree::collect(&context, dir.path(), Some(2), true)
            .await
            .unwrap();
        let stored = show(&context, dir.path()).await.unwrap();
        let snapshot = stored.snapshot.unwrap();
        assert_eq!(snapshot.expanded_directories.at_surface, vec!["src".to_string()]);
        assert!(stored.file.ends_with(".json"));

        clear(&context, dir.path()).await.unwrap();
        assert!(show(&context, dir.path()).await.unwrap().snapshot.is_none());
    }

    #[tokio::test]
    async fn test_clear_without_snapshot_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();

        let code = run(
            &context(snapshots.path()),
            SnapshotAction::Clear {
                root: dir.path().to_path_buf(),
            },
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
    }
}
