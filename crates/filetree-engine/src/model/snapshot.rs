//! Persistence of the expanded directories and the scroll position.

use super::ModelService;
use filetree_core::{ExpandedDirectories, Result, TreeSnapshot};
use tokio::runtime::Handle;

impl ModelService {
    /// Captures the current expansion state and scroll position.
    ///
    /// Directories are recorded relative to the root. Those hidden under a
    /// collapsed ancestor go to `buried`, the rest to `at_surface`.
    #[must_use]
    pub fn build_snapshot(&self) -> TreeSnapshot {
        let tree = self.tree();
        let expanded_directories = tree.with_store(|store| {
            let mut directories = ExpandedDirectories::default();
            let Some(root) = store.root_node() else {
                return directories;
            };
            let prefix = format!("{}/", root.path());
            for id in store.ids() {
                let Some(node) = store.get(id) else {
                    continue;
                };
                if id == root.id() || !node.is_directory() || !node.is_expanded() {
                    continue;
                }
                let Some(relative) = node.path().strip_prefix(&prefix) else {
                    continue;
                };
                let at_surface = store
                    .ancestors(id)
                    .into_iter()
                    .all(|ancestor| store.get(ancestor).is_some_and(|a| a.is_expanded()));
                if at_surface {
                    directories.at_surface.push(relative.to_string());
                } else {
                    directories.buried.push(relative.to_string());
                }
            }
            directories.at_surface.sort();
            directories.buried.sort();
            directories
        });

        TreeSnapshot {
            expanded_directories,
            scroll_position: tree.viewport().scroll_offset,
        }
    }

    /// Writes the current snapshot to the storage.
    ///
    /// Does nothing before a workspace is opened.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails.
    pub async fn save_snapshot(&self) -> Result<()> {
        let Some(workspace) = self.inner.workspace.lock().clone() else {
            return Ok(());
        };
        let snapshot = self.build_snapshot();
        self.inner.storage.save(&workspace, &snapshot).await
    }

    // Structural changes made while replaying must not overwrite the stored
    // snapshot with a partial one.
    pub(super) fn schedule_snapshot_save(&self) {
        if !self.is_snapshot_loaded() || self.inner.workspace.lock().is_none() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("no runtime, snapshot not saved");
            return;
        };
        let model = self.clone();
        handle.spawn(async move {
            if let Err(e) = model.save_snapshot().await {
                tracing::warn!(error = %e, "failed to save snapshot");
            }
        });
    }

    /// Re-expands the directories of `snapshot` and restores the scroll
    /// position.
    ///
    /// Directories that no longer exist are skipped. Buried directories are
    /// expanded without expanding the collapsed ancestors above them.
    pub(super) async fn replay_snapshot(&self, snapshot: &TreeSnapshot) {
        let Some(root_uri) = self.tree().root().and_then(|root| self.node(root)).map(|n| n.uri().clone())
        else {
            return;
        };
        let directories = &snapshot.expanded_directories;

        let mut surface: Vec<&String> = directories.at_surface.iter().collect();
        surface.sort_by_key(|path| path.matches('/').count());
        for relative in surface {
            let uri = root_uri.join(relative);
            match self.reveal(&uri, true).await {
                Some(id) => {
                    self.service().expand(id).await;
                }
                None => tracing::debug!(path = %relative, "expanded directory is gone"),
            }
        }

        for relative in &directories.buried {
            let uri = root_uri.join(relative);
            match self.reveal(&uri, false).await {
                Some(id) => {
                    self.service().expand(id).await;
                }
                None => tracing::debug!(path = %relative, "expanded directory is gone"),
            }
        }

        self.tree().scroll_to(snapshot.scroll_position);
        tracing::debug!(
            at_surface = directories.at_surface.len(),
            buried = directories.buried.len(),
            "snapshot replayed"
        );
    }
}
