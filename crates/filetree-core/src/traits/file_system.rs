//! Filesystem collaborator trait.
//!
//! This module defines [`FileTreeApi`], the only way the engine reads or
//! mutates the filesystem it mirrors.

use crate::{FileChange, FileStat, FileUri, ResolvedChildren, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Filesystem operations consumed by the tree engine.
///
/// Every method is a suspension point. Implementations report failures as
/// [`crate::Error::OperationFailed`] (or [`crate::Error::ResolveFailed`] for
/// listings) carrying the backend's message.
///
/// # Type Safety
///
/// All implementations must be `Send + Sync` to work with Tokio's async runtime.
///
/// # Examples
///
/// ```
/// use filetree_core::traits::FileTreeApi;
/// use filetree_core::{FileChange, FileStat, FileUri, ResolvedChildren, Result};
/// use async_trait::async_trait;
/// use tokio::sync::broadcast;
///
/// struct EmptyFs {
///     events: broadcast::Sender<Vec<FileChange>>,
/// }
///
/// #[async_trait]
/// impl FileTreeApi for EmptyFs {
///     async fn resolve_children(&self, uri: &FileUri) -> Result<ResolvedChildren> {
///         Ok(ResolvedChildren {
///             children: Vec::new(),
///             filestat: Some(FileStat::directory(uri.clone())),
///         })
///     }
///     async fn get_file_stat(&self, _uri: &FileUri) -> Result<Option<FileStat>> {
///         Ok(None)
///     }
///     async fn mv(&self, _from: &FileUri, _to: &FileUri) -> Result<()> { Ok(()) }
///     async fn copy(&self, _from: &FileUri, _to: &FileUri) -> Result<()> { Ok(()) }
///     async fn delete(&self, _uri: &FileUri) -> Result<()> { Ok(()) }
///     async fn create_file(&self, _uri: &FileUri) -> Result<()> { Ok(()) }
///     async fn create_directory(&self, _uri: &FileUri) -> Result<()> { Ok(()) }
///     fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>> {
///         self.events.subscribe()
///     }
///     fn user_home(&self) -> Option<FileUri> {
///         None
///     }
/// }
/// ```
#[async_trait]
pub trait FileTreeApi: Send + Sync {
    /// Lists the direct children of a directory.
    ///
    /// Children are returned in backend order; the engine sorts them.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    async fn resolve_children(&self, uri: &FileUri) -> Result<ResolvedChildren>;

    /// Reads the stat of a single entry.
    ///
    /// Returns `Ok(None)` if the entry does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be read.
    async fn get_file_stat(&self, uri: &FileUri) -> Result<Option<FileStat>>;

    /// Moves or renames an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or the target exists.
    async fn mv(&self, from: &FileUri, to: &FileUri) -> Result<()>;

    /// Copies an entry, recursively for directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or the target exists.
    async fn copy(&self, from: &FileUri, to: &FileUri) -> Result<()>;

    /// Deletes an entry, recursively for directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    async fn delete(&self, uri: &FileUri) -> Result<()>;

    /// Creates an empty file, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry already exists.
    async fn create_file(&self, uri: &FileUri) -> Result<()>;

    /// Creates a directory, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry already exists.
    async fn create_directory(&self, uri: &FileUri) -> Result<()>;

    /// Subscribes to batches of change events.
    fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>>;

    /// Home directory of the user, if the backend has one.
    fn user_home(&self) -> Option<FileUri>;
}
