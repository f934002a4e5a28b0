//! Builder pattern for constructing in-memory filesystems.
//!
//! Provides a fluent API for seeding a [`MemoryFileSystem`] with files and
//! directories. Seeding never broadcasts change events.
//!
//! # Examples
//!
//! ```
//! use filetree_vfs::MemoryFsBuilder;
//!
//! let fs = MemoryFsBuilder::new()
//!     .add_file("/w/src/main.rs", "fn main() {}")
//!     .add_dir("/w/target")
//!     .build()
//!     .unwrap();
//!
//! assert!(fs.exists("/w/src"));
//! assert!(fs.exists("/w/target"));
//! ```

use crate::fs::MemoryFileSystem;
use crate::types::{Result, VfsEntry, VfsError};
use filetree_core::FileUri;

/// Builder for constructing a [`MemoryFileSystem`].
///
/// Errors from individual additions are collected and the first one is
/// reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct MemoryFsBuilder {
    fs: MemoryFileSystem,
    errors: Vec<VfsError>,
}

impl MemoryFsBuilder {
    /// Creates a builder for an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, creating missing parent directories.
    #[must_use]
    pub fn add_file(self, path: impl AsRef<str>, content: impl Into<String>) -> Self {
        self.add_entry(path, VfsEntry::file(content))
    }

    /// Adds several files at once.
    #[must_use]
    pub fn add_files<P, C>(mut self, files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<str>,
        C: Into<String>,
    {
        for (path, content) in files {
            self = self.add_file(path, content);
        }
        self
    }

    /// Adds a directory, creating missing parent directories.
    #[must_use]
    pub fn add_dir(self, path: impl AsRef<str>) -> Self {
        self.add_entry(path, VfsEntry::directory())
    }

    /// Adds a directory reached through a symbolic link.
    #[must_use]
    pub fn add_symlink_dir(self, path: impl AsRef<str>) -> Self {
        self.add_entry(path, VfsEntry::symlink_directory())
    }

    /// Sets the home directory of the filesystem.
    #[must_use]
    pub fn home(mut self, path: impl AsRef<str>) -> Self {
        self.fs = self.fs.with_home(FileUri::file(path));
        self
    }

    fn add_entry(mut self, path: impl AsRef<str>, entry: VfsEntry) -> Self {
        if let Err(e) = self.fs.insert(path, entry) {
            self.errors.push(e);
        }
        self
    }

    /// Builds the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered while adding entries.
    pub fn build(self) -> Result<MemoryFileSystem> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        Ok(self.fs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetree_core::traits::FileTreeApi;

    #[test]
    fn test_builder_default() {
        let fs = MemoryFsBuilder::default().build().unwrap();
        assert_eq!(fs.paths().len(), 1);
    }

    #[test]
    fn test_add_file_invalid_path() {
        let result = MemoryFsBuilder::new()
            .add_file("relative/path", "content")
            .build();
        assert!(result.unwrap_err().is_invalid_path());
    }

    #[test]
    fn test_file_under_file_fails() {
        let result = MemoryFsBuilder::new()
            .add_file("/w/a.txt", "")
            .add_file("/w/a.txt/b.txt", "")
            .build();
        assert!(result.unwrap_err().is_not_directory());
    }

    #[test]
    fn test_add_files() {
        let fs = MemoryFsBuilder::new()
            .add_files(vec![("/w/1.txt", "one"), ("/w/2.txt", "two")])
            .build()
            .unwrap();
        assert_eq!(fs.read_file("/w/2.txt").unwrap(), "two");
    }

    #[test]
    fn test_home() {
        let fs = MemoryFsBuilder::new().home("/home/me").build().unwrap();
        assert_eq!(fs.user_home(), Some(FileUri::file("/home/me")));
    }

    #[tokio::test]
    async fn test_symlink_dir_stat() {
        let fs = MemoryFsBuilder::new()
            .add_symlink_dir("/w/link")
            .build()
            .unwrap();
        let stat = fs.get_file_stat(&FileUri::file("/w/link")).await.unwrap().unwrap();
        assert!(stat.is_symbolic_link);
    }

    #[tokio::test]
    async fn test_seeding_is_silent() {
        let fs = MemoryFileSystem::new();
        let mut events = fs.subscribe();
        fs.insert("/w/a.txt", VfsEntry::file("")).unwrap();
        assert!(events.try_recv().is_err());
    }
}
