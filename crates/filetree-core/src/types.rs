//! Strong domain types for the file tree engine.
//!
//! Newtypes keep node ids, uris and workspace ids from being mixed up with
//! plain integers and strings.
//!
//! # Examples
//!
//! ```
//! use filetree_core::{FileUri, NodeId};
//!
//! let uri = FileUri::file("/workspace/src/main.rs");
//! assert_eq!(uri.name(), "main.rs");
//! assert_eq!(uri.to_string(), "file:///workspace/src/main.rs");
//!
//! let id = NodeId::new(7);
//! assert_eq!(id.get(), 7);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a tree node.
///
/// Ids are handed out by the node store of one session and reused when a
/// node is re-created at the same logical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `file://` uri with a normalized absolute path.
///
/// The path always starts with `/`, uses `/` separators, has no empty or `.`
/// segments, and has no trailing slash (except for the filesystem root).
///
/// # Examples
///
/// ```
/// use filetree_core::FileUri;
///
/// let root = FileUri::parse("file:///workspace/");
/// let file = root.join("src/lib.rs");
///
/// assert_eq!(file.path(), "/workspace/src/lib.rs");
/// assert_eq!(root.relative(&file).as_deref(), Some("src/lib.rs"));
/// assert_eq!(file.parent().unwrap().name(), "src");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileUri(String);

impl FileUri {
    /// Scheme prefix used when displaying the uri.
    pub const SCHEME_PREFIX: &'static str = "file://";

    /// Creates a uri from a filesystem path.
    ///
    /// Backslashes are treated as separators.
    #[must_use]
    pub fn file(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref().replace('\\', "/");
        let segments: Vec<&str> = raw
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        Self(format!("/{}", segments.join("/")))
    }

    /// Parses a `file://` uri string, or a bare path.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::file(value.strip_prefix(Self::SCHEME_PREFIX).unwrap_or(value))
    }

    /// Returns the normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the filesystem root `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the last path segment, or an empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Returns the parent uri, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        self.0.rfind('/').map(|pos| {
            if pos == 0 {
                Self("/".to_string())
            } else {
                Self(self.0[..pos].to_string())
            }
        })
    }

    /// Resolves a relative path (which may contain `/`) against this uri.
    #[must_use]
    pub fn join(&self, relative: &str) -> Self {
        Self::file(format!("{}/{}", self.0, relative))
    }

    /// Returns the path of `other` relative to `self`.
    ///
    /// Returns `Some("")` when both are equal and `None` when `other` is not
    /// inside `self`.
    #[must_use]
    pub fn relative(&self, other: &Self) -> Option<String> {
        if self == other {
            return Some(String::new());
        }
        let prefix = if self.is_root() {
            "/".to_string()
        } else {
            format!("{}/", self.0)
        };
        other.0.strip_prefix(&prefix).map(str::to_string)
    }

    /// Returns `true` if `other` equals this uri or lies beneath it.
    #[must_use]
    pub fn is_equal_or_parent(&self, other: &Self) -> bool {
        self.relative(other).is_some()
    }

    /// Returns the number of path segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::SCHEME_PREFIX, self.0)
    }
}

/// Metadata of a filesystem entry, as reported by the filesystem collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStat {
    /// Location of the entry
    pub uri: FileUri,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Whether the entry is a symbolic link
    pub is_symbolic_link: bool,
    /// Last modification time, milliseconds since the Unix epoch
    pub last_modification: i64,
    /// Size in bytes, when known
    pub size: Option<u64>,
}

impl FileStat {
    /// Creates the stat of a directory.
    #[must_use]
    pub const fn directory(uri: FileUri) -> Self {
        Self {
            uri,
            is_directory: true,
            is_symbolic_link: false,
            last_modification: 0,
            size: None,
        }
    }

    /// Creates the stat of a regular file.
    #[must_use]
    pub const fn file(uri: FileUri) -> Self {
        Self {
            uri,
            is_directory: false,
            is_symbolic_link: false,
            last_modification: 0,
            size: None,
        }
    }

    /// Sets the size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the last modification time.
    #[must_use]
    pub const fn with_modified(mut self, millis: i64) -> Self {
        self.last_modification = millis;
        self
    }

    /// Marks the entry as a symbolic link.
    #[must_use]
    pub const fn with_symlink(mut self, symlink: bool) -> Self {
        self.is_symbolic_link = symlink;
        self
    }
}

/// Result of listing a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChildren {
    /// Direct children, unsorted
    pub children: Vec<FileStat>,
    /// Stat of the listed directory itself, if it could be read
    pub filestat: Option<FileStat>,
}

/// Kind of a filesystem change event.
///
/// The discriminants follow the watcher protocol: updates are the weakest
/// change, deletions the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileChangeType {
    /// Entry content or metadata changed
    Updated = 0,
    /// Entry was created
    Added = 1,
    /// Entry was removed
    Deleted = 2,
}

/// A single filesystem change event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChange {
    /// Changed entry
    pub uri: FileUri,
    /// What happened
    #[serde(rename = "type")]
    pub change_type: FileChangeType,
}

impl FileChange {
    /// Creates an `Added` event.
    #[must_use]
    pub const fn added(uri: FileUri) -> Self {
        Self {
            uri,
            change_type: FileChangeType::Added,
        }
    }

    /// Creates an `Updated` event.
    #[must_use]
    pub const fn updated(uri: FileUri) -> Self {
        Self {
            uri,
            change_type: FileChangeType::Updated,
        }
    }

    /// Creates a `Deleted` event.
    #[must_use]
    pub const fn deleted(uri: FileUri) -> Self {
        Self {
            uri,
            change_type: FileChangeType::Deleted,
        }
    }
}

/// Workspace identity used to key persisted UI state.
///
/// # Examples
///
/// ```
/// use filetree_core::{FileUri, WorkspaceId};
///
/// let id = WorkspaceId::from_uri(&FileUri::file("/home/me/project"));
/// assert_eq!(id.as_str(), "file:///home/me/project");
/// assert_eq!(id.storage_key().len(), 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Creates a workspace id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates the id of a workspace rooted at `uri`.
    #[must_use]
    pub fn from_uri(uri: &FileUri) -> Self {
        Self(uri.to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a filesystem-safe key derived from the id.
    ///
    /// The key is the first 32 hex characters of the blake3 hash.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let hash = blake3::hash(self.0.as_bytes());
        hash.to_hex()[..32].to_string()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_normalization() {
        assert_eq!(FileUri::file("/a//b/./c/").path(), "/a/b/c");
        assert_eq!(FileUri::file("a\\b").path(), "/a/b");
        assert_eq!(FileUri::file("").path(), "/");
        assert_eq!(FileUri::parse("file:///x/y").path(), "/x/y");
    }

    #[test]
    fn test_uri_parent_and_name() {
        let uri = FileUri::file("/w/src/lib.rs");
        assert_eq!(uri.name(), "lib.rs");
        assert_eq!(uri.parent().unwrap().path(), "/w/src");
        assert_eq!(FileUri::file("/w").parent().unwrap().path(), "/");
        assert!(FileUri::file("/").parent().is_none());
        assert_eq!(FileUri::file("/").name(), "");
    }

    #[test]
    fn test_uri_relative() {
        let root = FileUri::file("/w");
        assert_eq!(root.relative(&FileUri::file("/w/a/b")).as_deref(), Some("a/b"));
        assert_eq!(root.relative(&root).as_deref(), Some(""));
        assert!(root.relative(&FileUri::file("/wx/a")).is_none());
        assert_eq!(
            FileUri::file("/").relative(&FileUri::file("/w")).as_deref(),
            Some("w")
        );
    }

    #[test]
    fn test_uri_join_multi_segment() {
        let root = FileUri::file("/w");
        assert_eq!(root.join("a/b/c.txt").path(), "/w/a/b/c.txt");
        assert_eq!(FileUri::file("/").join("w").path(), "/w");
    }

    #[test]
    fn test_uri_depth_and_display() {
        let uri = FileUri::file("/w/a");
        assert_eq!(uri.depth(), 2);
        assert_eq!(uri.to_string(), "file:///w/a");
    }

    #[test]
    fn test_change_type_order() {
        assert!(FileChangeType::Deleted > FileChangeType::Added);
        assert!(FileChangeType::Added > FileChangeType::Updated);
    }

    #[test]
    fn test_file_change_serde() {
        let change = FileChange::deleted(FileUri::file("/w/a"));
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"uri":"/w/a","type":"DELETED"}"#);
    }

    #[test]
    fn test_workspace_storage_key_is_stable() {
        let a = WorkspaceId::new("file:///w");
        let b = WorkspaceId::new("file:///w");
        assert_eq!(a.storage_key(), b.storage_key());
        assert_ne!(a.storage_key(), WorkspaceId::new("file:///v").storage_key());
    }
}
