//! Locate command implementation.
//!
//! Reveals a path in the tree: its ancestors are expanded, the node is
//! selected and scrolled into view.

use super::CommandContext;
use super::common::{TreeRow, open_workspace, visible_rows};
use crate::output::{ExitCode, OutputFormat};
use anyhow::{Context, Result};
use colored::Colorize;
use filetree_core::FileUri;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a locate request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LocateReport {
    /// Requested location
    pub target: String,
    /// Tree path of the revealed node
    pub node: Option<String>,
    /// Visible index of the revealed node
    pub index: Option<usize>,
    /// Scroll offset after revealing, in pixels
    pub scroll_offset: f64,
    /// Visible rows after revealing
    pub rows: Vec<TreeRow>,
}

impl LocateReport {
    /// Returns `true` if the target was revealed.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.node.is_some()
    }
}

/// Runs the locate command.
///
/// Exits with [`ExitCode::NOT_FOUND`] if the target does not exist.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened, the target lies
/// outside of it, or the session snapshot cannot be saved.
pub async fn run(
    context: &CommandContext,
    root: &Path,
    target: &str,
    session: bool,
) -> Result<ExitCode> {
    let report = locate(context, root, target, session).await?;

    let formatted = match context.format {
        OutputFormat::Pretty => pretty(&report)?,
        format => crate::formatters::format_output(&report, format)
            .context("failed to format location")?,
    };
    println!("{formatted}");

    if report.is_found() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::NOT_FOUND)
    }
}

/// Opens the workspace and reveals `target` in it.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened, the target lies
/// outside of it, or the session snapshot cannot be saved.
pub async fn locate(
    context: &CommandContext,
    root: &Path,
    target: &str,
    session: bool,
) -> Result<LocateReport> {
    let workspace = open_workspace(root, &context.config, context.storage(session)?).await?;
    let uri = if Path::new(target).is_absolute() {
        FileUri::file(target)
    } else {
        workspace.uri.join(target)
    };
    if !workspace.uri.is_equal_or_parent(&uri) {
        anyhow::bail!("{} is outside of workspace {}", uri.path(), workspace.uri.path());
    }

    let model = &workspace.model;
    let located = model.location(&uri).await;
    match located {
        Some(id) => info!(node = %id, "revealed {}", uri.path()),
        None => warn!("{} not found", uri.path()),
    }

    if session {
        model
            .save_snapshot()
            .await
            .context("failed to save session snapshot")?;
    }

    Ok(LocateReport {
        target: uri.path().to_string(),
        node: located
            .and_then(|id| model.node(id))
            .map(|node| node.path().to_string()),
        index: located.and_then(|id| model.tree().index_of(id)),
        scroll_offset: model.tree().viewport().scroll_offset,
        rows: visible_rows(model),
    })
}

fn pretty(report: &LocateReport) -> Result<String> {
    let outline = crate::formatters::format_rows(&report.rows, OutputFormat::Pretty)?;
    let status = match &report.node {
        Some(node) => format!("{} {}", "Revealed".green().bold(), node),
        None => format!("{} {}", "Not found:".red().bold(), report.target),
    };
    Ok(format!("{outline}\n\n{status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetree_core::TreeConfig;
    use filetree_engine::decoration::SELECTED;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/engine")).unwrap();
        std::fs::write(dir.path().join("src/engine/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        dir
    }

    fn context(snapshots: &Path) -> CommandContext {
        CommandContext {
            config: TreeConfig::default(),
            snapshot_dir: Some(snapshots.to_path_buf()),
            format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_locate_expands_ancestors_and_selects() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();

        let report = locate(&context(snapshots.path()), dir.path(), "src/engine/mod.rs", false)
            .await
            .unwrap();

        assert!(report.is_found());
        assert!(report.node.as_deref().unwrap().ends_with("/src/engine/mod.rs"));
        assert_eq!(report.index, Some(2));
        let names: Vec<&str> = report.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["src", "engine", "mod.rs", "main.rs", "README.md"]);
        assert_eq!(report.rows[2].classes, vec![SELECTED.to_string()]);
    }

    #[tokio::test]
    async fn test_locate_missing_path_is_not_found() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();

        let report = locate(&context(snapshots.path()), dir.path(), "src/nope.rs", false)
            .await
            .unwrap();

        assert!(!report.is_found());
        assert_eq!(report.index, None);
        let code = run(&context(snapshots.path()), dir.path(), "src/nope.rs", false)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_locate_outside_workspace_fails() {
        let dir = project();
        let snapshots = tempfile::tempdir().unwrap();

        let err = locate(&context(snapshots.path()), dir.path(), "/definitely/elsewhere", false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("outside of workspace"));
    }

    #[tokio::test]
    async fn test_locate_scrolls_into_a_small_viewport() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            std::fs::write(dir.path().join(format!("file{i:02}.txt")), "").unwrap();
        }
        let snapshots = tempfile::tempdir().unwrap();
        let mut context = context(snapshots.path());
        context.config.viewport_height = 110.0;

        let report = locate(&context, dir.path(), "file19.txt", false)
            .await
            .unwrap();

        assert_eq!(report.index, Some(19));
        assert!(report.scroll_offset > 0.0);
    }
}
