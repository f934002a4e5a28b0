//! Core types for the in-memory filesystem.
//!
//! This module defines validated paths, stored entries and the VFS error
//! type, plus the mapping of VFS errors onto engine errors.
//!
//! # Examples
//!
//! ```
//! use filetree_vfs::{VfsEntry, VfsPath};
//!
//! let path = VfsPath::new("/w/src/main.rs").unwrap();
//! let entry = VfsEntry::file("fn main() {}");
//!
//! assert_eq!(path.name(), "main.rs");
//! assert_eq!(entry.size(), Some(12));
//! ```

use filetree_core::{FileOperation, FileStat, FileUri};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during VFS operations.
///
/// All error variants include contextual information and implement
/// `is_xxx()` methods for easy error classification.
///
/// # Examples
///
/// ```
/// use filetree_vfs::VfsError;
///
/// let error = VfsError::FileNotFound {
///     path: "/missing.txt".to_string(),
/// };
///
/// assert!(error.is_not_found());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    /// File or directory not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// Path exists but is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory
        path: String,
    },

    /// Target of a create, move or copy already exists
    #[error("File already exists: {path}")]
    AlreadyExists {
        /// The existing path
        path: String,
    },

    /// Path is invalid or malformed
    #[error("Invalid path: {path}")]
    InvalidPath {
        /// The invalid path
        path: String,
    },

    /// Path is not absolute (must start with '/')
    #[error("Path must be absolute: {path}")]
    PathNotAbsolute {
        /// The relative path
        path: String,
    },

    /// Path contains invalid components (e.g., '..')
    #[error("Path contains invalid components: {path}")]
    InvalidPathComponent {
        /// The path with invalid components
        path: String,
    },

    /// A directory cannot be moved or copied into itself
    #[error("Cannot move {from} into its own subtree {to}")]
    IntoOwnSubtree {
        /// Source path
        from: String,
        /// Target path
        to: String,
    },

    /// Failure registered through failure injection
    #[error("{message}")]
    Injected {
        /// Message to report
        message: String,
    },
}

impl VfsError {
    /// Returns `true` if this is a file not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    /// Returns `true` if this is a not-a-directory error.
    #[must_use]
    pub const fn is_not_directory(&self) -> bool {
        matches!(self, Self::NotADirectory { .. })
    }

    /// Returns `true` if the target already exists.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if this is an invalid path error.
    ///
    /// # Examples
    ///
    /// ```
    /// use filetree_vfs::VfsError;
    ///
    /// let error = VfsError::PathNotAbsolute {
    ///     path: "relative".to_string(),
    /// };
    ///
    /// assert!(error.is_invalid_path());
    /// ```
    #[must_use]
    pub const fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. }
                | Self::PathNotAbsolute { .. }
                | Self::InvalidPathComponent { .. }
                | Self::IntoOwnSubtree { .. }
        )
    }

    /// Returns `true` if the failure was injected.
    #[must_use]
    pub const fn is_injected(&self) -> bool {
        matches!(self, Self::Injected { .. })
    }

    /// Converts the error into an engine error for `operation` on `uri`.
    ///
    /// Listing failures become [`filetree_core::Error::ResolveFailed`], every
    /// other operation becomes [`filetree_core::Error::OperationFailed`].
    ///
    /// # Examples
    ///
    /// ```
    /// use filetree_core::{FileOperation, FileUri};
    /// use filetree_vfs::VfsError;
    ///
    /// let uri = FileUri::file("/w/a.txt");
    /// let err = VfsError::AlreadyExists { path: "/w/a.txt".to_string() }
    ///     .into_engine_error(FileOperation::CreateFile, &uri);
    ///
    /// assert!(err.is_operation_error());
    /// ```
    #[must_use]
    pub fn into_engine_error(self, operation: FileOperation, uri: &FileUri) -> filetree_core::Error {
        match operation {
            FileOperation::Resolve => filetree_core::Error::ResolveFailed {
                uri: uri.to_string(),
                message: self.to_string(),
            },
            other => filetree_core::Error::operation(other, uri.to_string(), self.to_string()),
        }
    }
}

/// A validated virtual filesystem path.
///
/// `VfsPath` uses Unix-style conventions on all platforms:
/// - Must start with '/' (absolute paths only)
/// - Free of `.` and `..` segments
/// - No empty segments and no trailing slash, except for the root `/`
///
/// # Examples
///
/// ```
/// use filetree_vfs::VfsPath;
///
/// let path = VfsPath::new("/w/src/lib.rs").unwrap();
/// assert_eq!(path.parent().unwrap().as_str(), "/w/src");
///
/// // Invalid paths are rejected
/// assert!(VfsPath::new("relative/path").is_err());
/// assert!(VfsPath::new("/parent/../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VfsPath(String);

impl VfsPath {
    /// Creates a new `VfsPath`.
    ///
    /// Duplicate and trailing slashes are removed.
    ///
    /// # Errors
    ///
    /// Returns `VfsError::InvalidPath` if the path is empty.
    /// Returns `VfsError::PathNotAbsolute` if the path does not start with '/'.
    /// Returns `VfsError::InvalidPathComponent` if a segment is `.` or `..`.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();

        if raw.is_empty() {
            return Err(VfsError::InvalidPath {
                path: String::new(),
            });
        }

        if !raw.starts_with('/') {
            return Err(VfsError::PathNotAbsolute {
                path: raw.to_string(),
            });
        }

        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|s| *s == "." || *s == "..") {
            return Err(VfsError::InvalidPathComponent {
                path: raw.to_string(),
            });
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// Creates the path of an engine uri.
    ///
    /// # Errors
    ///
    /// Returns an error if the uri path contains `..` segments.
    pub fn from_uri(uri: &FileUri) -> Result<Self> {
        Self::new(uri.path())
    }

    /// The filesystem root `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the engine uri of this path.
    #[must_use]
    pub fn to_uri(&self) -> FileUri {
        FileUri::file(&self.0)
    }

    /// Returns `true` for the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the last segment, or an empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Returns the parent directory path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        self.0.rfind('/').map(|pos| {
            if pos == 0 {
                Self::root()
            } else {
                Self(self.0[..pos].to_string())
            }
        })
    }

    /// Returns `true` if `other` lies strictly beneath this path.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Re-bases this path from `from` onto `to`.
    ///
    /// Returns `None` if this path is neither `from` nor beneath it.
    #[must_use]
    pub fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        if self == from {
            return Some(to.clone());
        }
        if !from.is_ancestor_of(self) {
            return None;
        }
        let rest = if from.is_root() {
            &self.0[1..]
        } else {
            &self.0[from.0.len() + 1..]
        };
        if to.is_root() {
            Some(Self(format!("/{rest}")))
        } else {
            Some(Self(format!("{}/{rest}", to.0)))
        }
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry stored in the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsEntry {
    /// Regular file with text content
    File {
        /// File content
        content: String,
        /// Logical modification time
        modified: i64,
    },
    /// Directory
    Directory {
        /// Whether the directory is reached through a symbolic link
        symlink: bool,
        /// Logical modification time
        modified: i64,
    },
}

impl VfsEntry {
    /// Creates a file entry.
    #[must_use]
    pub fn file(content: impl Into<String>) -> Self {
        Self::File {
            content: content.into(),
            modified: 0,
        }
    }

    /// Creates a directory entry.
    #[must_use]
    pub const fn directory() -> Self {
        Self::Directory {
            symlink: false,
            modified: 0,
        }
    }

    /// Creates a directory entry reached through a symbolic link.
    #[must_use]
    pub const fn symlink_directory() -> Self {
        Self::Directory {
            symlink: true,
            modified: 0,
        }
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Returns the file size, or `None` for directories.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::File { content, .. } => u64::try_from(content.len()).ok(),
            Self::Directory { .. } => None,
        }
    }

    /// Sets the logical modification time.
    pub const fn touch(&mut self, time: i64) {
        match self {
            Self::File { modified, .. } | Self::Directory { modified, .. } => *modified = time,
        }
    }

    /// Builds the engine stat of this entry at `path`.
    #[must_use]
    pub fn stat(&self, path: &VfsPath) -> FileStat {
        match self {
            Self::File { modified, .. } => {
                let stat = FileStat::file(path.to_uri()).with_modified(*modified);
                match self.size() {
                    Some(size) => stat.with_size(size),
                    None => stat,
                }
            }
            Self::Directory { symlink, modified } => FileStat::directory(path.to_uri())
                .with_symlink(*symlink)
                .with_modified(*modified),
        }
    }
}

/// Result type for VFS operations.
pub type Result<T> = std::result::Result<T, VfsError>;
