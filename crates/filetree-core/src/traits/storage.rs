//! Snapshot storage trait.
//!
//! This module defines [`SnapshotStorage`] for persisting tree UI state
//! (expanded directories, scroll offset) across sessions.

use crate::{Result, TreeSnapshot, WorkspaceId};
use async_trait::async_trait;

/// Persists [`TreeSnapshot`]s per workspace.
///
/// Saves replace the previous snapshot of the workspace wholesale.
///
/// # Type Safety
///
/// All implementations must be `Send + Sync` to work with Tokio's async runtime.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Loads the snapshot of a workspace.
    ///
    /// Returns `Ok(None)` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored data is corrupt.
    async fn load(&self, workspace: &WorkspaceId) -> Result<Option<TreeSnapshot>>;

    /// Saves the snapshot of a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn save(&self, workspace: &WorkspaceId, snapshot: &TreeSnapshot) -> Result<()>;

    /// Removes the snapshot of a workspace. Missing snapshots are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn clear(&self, workspace: &WorkspaceId) -> Result<()>;
}
