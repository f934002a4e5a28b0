//! Error types for the file tree state engine.
//!
//! The hierarchy mirrors how each failure is surfaced:
//! - [`ValidationError`] is user-correctable and shown inline at the prompt.
//! - [`Error::OperationFailed`] means a filesystem call failed and is shown as
//!   a message; decoration state touched by the operation is rolled back.
//! - [`Error::StaleReference`] is produced when an async completion finds its
//!   node gone. Callers discard it silently.
//! - [`Error::ResolveFailed`] never leaves the tree service: the subtree
//!   degrades to empty children.
//!
//! # Examples
//!
//! ```
//! use filetree_core::{Error, Result, ValidationError};
//!
//! fn check(name: &str) -> Result<()> {
//!     if name.trim().is_empty() {
//!         return Err(ValidationError::Empty.into());
//!     }
//!     Ok(())
//! }
//!
//! let err = check("  ").unwrap_err();
//! assert!(err.is_validation_error());
//! ```

use std::fmt;
use thiserror::Error;

/// Filesystem operations issued by the engine.
///
/// Used to label [`Error::OperationFailed`] so messages read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOperation {
    /// Listing the children of a directory
    Resolve,
    /// Moving or renaming an entry
    Move,
    /// Copying an entry
    Copy,
    /// Deleting an entry
    Delete,
    /// Creating an empty file
    CreateFile,
    /// Creating a directory
    CreateDirectory,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolve => "resolve",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::CreateFile => "create file",
            Self::CreateDirectory => "create directory",
        };
        f.write_str(label)
    }
}

/// Reasons a rename or create name is rejected.
///
/// These are shown at the input prompt; the filesystem is never touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty or only whitespace
    #[error("A file or folder name must be provided.")]
    Empty,

    /// Name starts with a path separator
    #[error("A file or folder name cannot start with a slash.")]
    LeadingSeparator,

    /// Another entry with that name exists in the target directory
    #[error("A file or folder {name} already exists at this location. Please choose a different name.")]
    AlreadyExists {
        /// The colliding name
        name: String,
    },

    /// One path segment is not a valid file name
    #[error("The name {segment} is not valid as a file or folder name. Please choose a different name.")]
    InvalidSegment {
        /// The offending segment
        segment: String,
    },
}

/// Non-blocking remarks about an otherwise valid name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameWarning {
    /// Name has leading or trailing whitespace
    LeadingOrTrailingWhitespace,
}

impl fmt::Display for NameWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeadingOrTrailingWhitespace => {
                f.write_str("Leading or trailing whitespace detected in file or folder name.")
            }
        }
    }
}

/// Main error type for the file tree engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A rename or create name was rejected.
    #[error("Invalid name: {0}")]
    Validation(#[from] ValidationError),

    /// A filesystem call failed.
    ///
    /// Carries the message reported by the filesystem collaborator.
    #[error("Failed to {operation} {uri}: {message}")]
    OperationFailed {
        /// Operation that failed
        operation: FileOperation,
        /// Uri the operation targeted
        uri: String,
        /// Message reported by the filesystem
        message: String,
    },

    /// Listing a directory failed.
    #[error("Failed to resolve children of {uri}: {message}")]
    ResolveFailed {
        /// Directory uri
        uri: String,
        /// Message reported by the filesystem
        message: String,
    },

    /// A node was invalidated while an async operation was in flight.
    #[error("Stale node reference: {path}")]
    StaleReference {
        /// Tree path the operation started from
        path: String,
    },

    /// Node, uri or path could not be found.
    #[error("Resource not found: {resource}")]
    ResourceNotFound {
        /// Identifier of the missing resource
        resource: String,
    },

    /// Snapshot storage failed.
    #[error("Snapshot storage error: {message}")]
    StorageError {
        /// Description of the storage problem
        message: String,
        /// Underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`].
    ///
    /// # Examples
    ///
    /// ```
    /// use filetree_core::{Error, FileOperation};
    ///
    /// let err = Error::operation(FileOperation::Move, "file:///a", "permission denied");
    /// assert!(err.is_operation_error());
    /// assert_eq!(err.to_string(), "Failed to move file:///a: permission denied");
    /// ```
    #[must_use]
    pub fn operation(
        operation: FileOperation,
        uri: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` if a filesystem operation failed.
    #[must_use]
    pub const fn is_operation_error(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }

    /// Returns `true` if this is a stale node reference.
    ///
    /// Stale references are expected under concurrent mutation and are never
    /// surfaced to the user.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }

    /// Returns `true` if this is a resource not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// Returns `true` if a directory listing failed.
    #[must_use]
    pub const fn is_resolve_error(&self) -> bool {
        matches!(self, Self::ResolveFailed { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns the message a user should see, if this error is user-facing.
    ///
    /// Stale references return `None`.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::StaleReference { .. } => None,
            Self::Validation(inner) => Some(inner.to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// Result type alias for file tree operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_detection() {
        let err: Error = ValidationError::LeadingSeparator.into();
        assert!(err.is_validation_error());
        assert!(!err.is_operation_error());
    }

    #[test]
    fn test_operation_error_message() {
        let err = Error::operation(FileOperation::CreateFile, "file:///w/a.txt", "exists");
        assert!(err.is_operation_error());
        assert_eq!(err.to_string(), "Failed to create file file:///w/a.txt: exists");
    }

    #[test]
    fn test_stale_reference_is_not_user_facing() {
        let err = Error::StaleReference {
            path: "/w/a".to_string(),
        };
        assert!(err.is_stale());
        assert!(err.user_message().is_none());
    }

    #[test]
    fn test_validation_user_message_has_no_prefix() {
        let err: Error = ValidationError::AlreadyExists {
            name: "a.txt".to_string(),
        }
        .into();
        assert_eq!(
            err.user_message().unwrap(),
            "A file or folder a.txt already exists at this location. Please choose a different name."
        );
    }

    #[test]
    fn test_not_found_and_config_detection() {
        let err = Error::ResourceNotFound {
            resource: "/w/missing".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_config_error());

        let err = Error::ConfigError {
            message: "item height".to_string(),
        };
        assert!(err.is_config_error());
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(
            NameWarning::LeadingOrTrailingWhitespace.to_string(),
            "Leading or trailing whitespace detected in file or folder name."
        );
    }
}
