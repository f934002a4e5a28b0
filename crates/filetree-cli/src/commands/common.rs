//! Workspace plumbing shared by the commands.

use crate::local_fs::LocalFileSystem;
use anyhow::{Context, Result};
use filetree_core::traits::SnapshotStorage;
use filetree_core::{FileUri, JsonSnapshotStorage, NodeId, TreeConfig};
use filetree_engine::ModelService;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One visible row of the tree.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeRow {
    /// Tree path
    pub path: String,
    /// Display name, `a/b` for folded directories
    pub name: String,
    /// Nesting level; children of the root are at 1
    pub depth: usize,
    /// Whether the row is a directory
    pub directory: bool,
    /// Whether the directory is expanded
    pub expanded: bool,
    /// Decoration classes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

/// An opened workspace.
#[derive(Debug)]
pub struct Workspace {
    /// Model over the local filesystem
    pub model: ModelService,
    /// Root node
    pub root: NodeId,
    /// Root uri
    pub uri: FileUri,
}

/// Canonical uri of a workspace directory.
///
/// # Errors
///
/// Returns an error if the path does not exist or is not a directory.
pub async fn root_uri(path: &Path) -> Result<FileUri> {
    let canonical = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("cannot open workspace {}", path.display()))?;
    let metadata = tokio::fs::metadata(&canonical).await?;
    if !metadata.is_dir() {
        anyhow::bail!("workspace {} is not a directory", canonical.display());
    }
    Ok(FileUri::file(canonical.to_string_lossy()))
}

/// Opens `path` through the engine.
///
/// The persisted snapshot of the workspace, if `storage` holds one, is
/// replayed before this returns.
///
/// # Errors
///
/// Returns an error if the workspace directory cannot be opened.
pub async fn open_workspace(
    path: &Path,
    config: &TreeConfig,
    storage: Arc<dyn SnapshotStorage>,
) -> Result<Workspace> {
    let uri = root_uri(path).await?;
    let model = ModelService::new(Arc::new(LocalFileSystem::new()), storage, config);
    let root = model.init(&uri, None).await;
    debug!(uri = %uri, "workspace opened");
    Ok(Workspace { model, root, uri })
}

/// Snapshot storage under `dir`, or under the user cache directory.
///
/// # Errors
///
/// Returns an error if no cache directory can be determined.
pub fn snapshot_storage(dir: Option<&Path>) -> Result<JsonSnapshotStorage> {
    match dir {
        Some(dir) => Ok(JsonSnapshotStorage::with_directory(dir)),
        None => JsonSnapshotStorage::new().context("failed to locate snapshot directory"),
    }
}

/// Expands every visible directory above `max_depth`.
///
/// Depth 1 leaves the root's children collapsed.
pub async fn expand_to_depth(model: &ModelService, max_depth: usize) {
    let mut attempted = HashSet::new();
    loop {
        let visible = model.tree().visible_nodes();
        let pending: Vec<NodeId> = model.tree().with_store(|store| {
            visible
                .into_iter()
                .filter(|id| {
                    store
                        .get(*id)
                        .is_some_and(|node| node.is_directory() && !node.is_expanded())
                        && store.depth(*id) < max_depth
                })
                .filter(|id| attempted.insert(*id))
                .collect()
        });
        if pending.is_empty() {
            break;
        }
        for id in pending {
            model.service().expand(id).await;
        }
    }
}

/// Visible rows in display order.
#[must_use]
pub fn visible_rows(model: &ModelService) -> Vec<TreeRow> {
    let visible = model.tree().visible_nodes();
    let rows: Vec<(TreeRow, NodeId)> = model.tree().with_store(|store| {
        visible
            .into_iter()
            .filter_map(|id| {
                let node = store.get(id)?;
                let row = TreeRow {
                    path: node.path().to_string(),
                    name: node.display_name().to_string(),
                    depth: store.depth(id),
                    directory: node.is_directory(),
                    expanded: node.is_expanded(),
                    classes: Vec::new(),
                };
                Some((row, id))
            })
            .collect()
    });

    rows.into_iter()
        .map(|(mut row, id)| {
            row.classes = model.classlist(id);
            row
        })
        .collect()
}
