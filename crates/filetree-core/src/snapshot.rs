//! Persisted tree UI state and the bundled snapshot storages.
//!
//! A [`TreeSnapshot`] records which directories were expanded and where the
//! viewport was scrolled. Paths are relative to the workspace root, so a
//! snapshot survives the workspace being opened from another location.
//!
//! # Examples
//!
//! ```
//! use filetree_core::{ExpandedDirectories, TreeSnapshot};
//!
//! let snapshot = TreeSnapshot {
//!     expanded_directories: ExpandedDirectories {
//!         at_surface: vec!["src".to_string()],
//!         buried: vec!["docs/api".to_string()],
//!     },
//!     scroll_position: 44.0,
//! };
//!
//! let json = serde_json::to_string(&snapshot).unwrap();
//! assert!(json.contains("\"atSurface\":[\"src\"]"));
//! assert!(json.contains("\"scrollPosition\":44.0"));
//! ```

use crate::traits::SnapshotStorage;
use crate::{Error, Result, WorkspaceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Expanded directories, split by whether all their ancestors are expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedDirectories {
    /// Expanded directories whose ancestors are all expanded
    pub at_surface: Vec<String>,
    /// Expanded directories below a collapsed ancestor
    pub buried: Vec<String>,
}

impl ExpandedDirectories {
    /// Returns `true` if no directory is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.at_surface.is_empty() && self.buried.is_empty()
    }
}

/// Serialized UI state of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeSnapshot {
    /// Expanded directories, relative to the root
    pub expanded_directories: ExpandedDirectories,
    /// Scroll offset of the viewport, in pixels
    pub scroll_position: f64,
}

/// In-memory snapshot storage.
///
/// Uses a `HashMap` protected by a `RwLock`; contents are lost when the
/// storage is dropped.
#[derive(Debug, Default)]
pub struct MemorySnapshotStorage {
    snapshots: RwLock<HashMap<WorkspaceId, TreeSnapshot>>,
}

impl MemorySnapshotStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load(&self, workspace: &WorkspaceId) -> Result<Option<TreeSnapshot>> {
        Ok(self.snapshots.read().await.get(workspace).cloned())
    }

    async fn save(&self, workspace: &WorkspaceId, snapshot: &TreeSnapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(workspace.clone(), snapshot.clone());
        Ok(())
    }

    async fn clear(&self, workspace: &WorkspaceId) -> Result<()> {
        self.snapshots.write().await.remove(workspace);
        Ok(())
    }
}

/// Snapshot storage writing one JSON file per workspace.
///
/// Files are named after [`WorkspaceId::storage_key`].
#[derive(Debug, Clone)]
pub struct JsonSnapshotStorage {
    directory: PathBuf,
}

impl JsonSnapshotStorage {
    /// Creates a storage under the user cache directory
    /// (`<cache>/filetree/snapshots`).
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be determined.
    pub fn new() -> Result<Self> {
        let directory = dirs::cache_dir()
            .ok_or_else(|| Error::StorageError {
                message: "Cannot determine cache directory".to_string(),
                source: None,
            })?
            .join("filetree")
            .join("snapshots");

        Ok(Self::with_directory(directory))
    }

    /// Creates a storage under a custom directory.
    ///
    /// The directory is created on the first save.
    ///
    /// # Examples
    ///
    /// ```
    /// use filetree_core::JsonSnapshotStorage;
    ///
    /// let storage = JsonSnapshotStorage::with_directory("/tmp/filetree");
    /// assert!(storage.directory().ends_with("filetree"));
    /// ```
    #[must_use]
    pub fn with_directory(path: impl AsRef<Path>) -> Self {
        Self {
            directory: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_for(&self, workspace: &WorkspaceId) -> PathBuf {
        self.directory
            .join(format!("{}.json", workspace.storage_key()))
    }
}

#[async_trait]
impl SnapshotStorage for JsonSnapshotStorage {
    async fn load(&self, workspace: &WorkspaceId) -> Result<Option<TreeSnapshot>> {
        let path = self.file_for(workspace);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::StorageError {
                    message: format!("Failed to read {}", path.display()),
                    source: Some(e),
                });
            }
        };

        let snapshot =
            serde_json::from_str(&content).map_err(|e| Error::SerializationError {
                message: format!("Corrupt snapshot {}", path.display()),
                source: Some(e),
            })?;

        tracing::debug!(workspace = %workspace, "loaded snapshot from {}", path.display());
        Ok(Some(snapshot))
    }

    async fn save(&self, workspace: &WorkspaceId, snapshot: &TreeSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::StorageError {
                message: format!("Failed to create {}", self.directory.display()),
                source: Some(e),
            })?;

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
            Error::SerializationError {
                message: "Failed to serialize snapshot".to_string(),
                source: Some(e),
            }
        })?;

        let path = self.file_for(workspace);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::StorageError {
                message: format!("Failed to write {}", path.display()),
                source: Some(e),
            })?;

        tracing::debug!(workspace = %workspace, "saved snapshot to {}", path.display());
        Ok(())
    }

    async fn clear(&self, workspace: &WorkspaceId) -> Result<()> {
        let path = self.file_for(workspace);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StorageError {
                message: format!("Failed to remove {}", path.display()),
                source: Some(e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_on_missing_fields() {
        let snapshot: TreeSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.expanded_directories.is_empty());
        assert!(snapshot.scroll_position.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemorySnapshotStorage::new();
        let workspace = WorkspaceId::new("file:///w");
        assert!(storage.load(&workspace).await.unwrap().is_none());

        let snapshot = TreeSnapshot {
            scroll_position: 10.0,
            ..Default::default()
        };
        storage.save(&workspace, &snapshot).await.unwrap();
        assert_eq!(storage.load(&workspace).await.unwrap(), Some(snapshot));

        storage.clear(&workspace).await.unwrap();
        assert!(storage.load(&workspace).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_is_keyed_by_workspace() {
        let storage = MemorySnapshotStorage::new();
        let a = WorkspaceId::new("file:///a");
        let b = WorkspaceId::new("file:///b");
        storage.save(&a, &TreeSnapshot::default()).await.unwrap();
        assert!(storage.load(&b).await.unwrap().is_none());
    }
}
