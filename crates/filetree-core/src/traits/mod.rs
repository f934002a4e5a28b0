//! Collaborator traits of the file tree engine.
//!
//! The engine never touches a real filesystem or a persistence backend
//! directly; it talks to implementations of these traits.
//!
//! # Module Structure
//!
//! - `file_system` - Directory listing, mutation and change events
//! - `storage` - Snapshot persistence keyed by workspace
//!
//! # Examples
//!
//! ```
//! use filetree_core::traits::SnapshotStorage;
//! use filetree_core::{MemorySnapshotStorage, TreeSnapshot, WorkspaceId};
//!
//! # async fn example() -> filetree_core::Result<()> {
//! let storage = MemorySnapshotStorage::new();
//! let workspace = WorkspaceId::new("file:///w");
//!
//! storage.save(&workspace, &TreeSnapshot::default()).await?;
//! assert!(storage.load(&workspace).await?.is_some());
//! # Ok(())
//! # }
//! ```

mod file_system;
mod storage;

pub use file_system::FileTreeApi;
pub use storage::SnapshotStorage;
