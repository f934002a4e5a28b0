//! Core types, traits, and errors for the file tree state engine.
//!
//! This crate provides the foundational types and abstractions shared by
//! every other crate in the workspace.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong domain types (`NodeId`, `FileUri`, `FileStat`, `WorkspaceId`)
//! - Error hierarchy with contextual information
//! - Collaborator traits for the filesystem and snapshot persistence
//! - Configuration types
//! - Snapshot model and the bundled snapshot storages

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod snapshot;
mod types;

pub mod traits;

pub use config::TreeConfig;
pub use error::{Error, FileOperation, NameWarning, Result, ValidationError};
pub use snapshot::{ExpandedDirectories, JsonSnapshotStorage, MemorySnapshotStorage, TreeSnapshot};
pub use types::{
    FileChange, FileChangeType, FileStat, FileUri, NodeId, ResolvedChildren, WorkspaceId,
};
