//! Tree command implementation.
//!
//! Opens a directory through the engine and prints its visible rows.

use super::CommandContext;
use super::common::{TreeRow, expand_to_depth, open_workspace, visible_rows};
use crate::output::ExitCode;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Runs the tree command.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened or the session
/// snapshot cannot be saved.
pub async fn run(
    context: &CommandContext,
    root: &Path,
    depth: Option<usize>,
    session: bool,
) -> Result<ExitCode> {
    let rows = collect(context, root, depth, session).await?;
    info!(rows = rows.len(), "tree listed");

    let formatted = crate::formatters::format_rows(&rows, context.format)
        .context("failed to format tree")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}

/// Opens the workspace, expands it and returns the visible rows.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened or the session
/// snapshot cannot be saved.
pub async fn collect(
    context: &CommandContext,
    root: &Path,
    depth: Option<usize>,
    session: bool,
) -> Result<Vec<TreeRow>> {
    let workspace = open_workspace(root, &context.config, context.storage(session)?).await?;
    if let Some(depth) = depth {
        expand_to_depth(&workspace.model, depth).await;
    }
    if session {
        workspace
            .model
            .save_snapshot()
            .await
            .context("failed to save session snapshot")?;
    }
    Ok(visible_rows(&workspace.model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use filetree_core::TreeConfig;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/engine")).unwrap();
        std::fs::write(dir.path().join("src/engine/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/only/inner")).unwrap();
        std::fs::write(dir.path().join("pkg/only/inner/leaf.txt"), "").unwrap();
        std::fs::write(dir.path().join(".env"), "").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        dir
    }

    fn context(compact: bool, snapshots: &Path) -> CommandContext {
        CommandContext {
            config: TreeConfig {
                compact_folders: compact,
                ..TreeConfig::default()
            },
            snapshot_dir: Some(snapshots.to_path_buf()),
            format: OutputFormat::Text,
        }
    }

    fn names(rows: &[TreeRow]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_top_level_is_sorted() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();

        let rows = collect(&context(false, snapshots.path()), dir.path(), None, false)
            .await
            .unwrap();

        assert_eq!(names(&rows), vec!["pkg", "src", "Cargo.toml", ".env"]);
        assert!(rows.iter().all(|row| row.depth == 1));
    }

    #[tokio::test]
    async fn test_compact_mode_folds_single_child_chains() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();

        let rows = collect(&context(true, snapshots.path()), dir.path(), Some(2), false)
            .await
            .unwrap();

        assert_eq!(
            names(&rows),
            vec![
                "pkg/only/inner",
                "leaf.txt",
                "src",
                "engine",
                "main.rs",
                "Cargo.toml",
                ".env",
            ]
        );
    }

    #[tokio::test]
    async fn test_session_restores_expanded_directories() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();
        let context = context(false, snapshots.path());

        collect(&context, dir.path(), Some(2), true).await.unwrap();
        let restored = collect(&context, dir.path(), None, true).await.unwrap();

        assert_eq!(
            names(&restored),
            vec!["pkg", "only", "src", "engine", "main.rs", "Cargo.toml", ".env"]
        );
        assert!(restored[0].expanded);
    }

    #[tokio::test]
    async fn test_run_missing_root_fails() {
        let snapshots = tempfile::tempdir().unwrap();
        let result = run(
            &context(false, snapshots.path()),
            &snapshots.path().join("missing"),
            None,
            false,
        )
        .await;
        assert!(result.is_err());
    }
}
