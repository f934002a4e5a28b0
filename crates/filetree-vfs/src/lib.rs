//! In-memory filesystem for the file tree engine.
//!
//! [`MemoryFileSystem`] implements [`filetree_core::traits::FileTreeApi`]
//! over a sorted map of entries. Every mutation broadcasts the matching
//! change events, every call is recorded in an operation log, and failures
//! can be injected per operation and uri.
//!
//! # Examples
//!
//! ```
//! use filetree_vfs::MemoryFsBuilder;
//!
//! let fs = MemoryFsBuilder::new()
//!     .add_dir("/w/dirA")
//!     .add_file("/w/fileB.txt", "hello")
//!     .build()
//!     .unwrap();
//!
//! assert!(fs.exists("/w/dirA"));
//! assert_eq!(fs.read_file("/w/fileB.txt").unwrap(), "hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod builder;
pub mod fs;
pub mod types;

pub use builder::MemoryFsBuilder;
pub use fs::{FsCall, MemoryFileSystem};
pub use types::{Result, VfsEntry, VfsError, VfsPath};
