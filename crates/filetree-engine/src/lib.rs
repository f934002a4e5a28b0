//! Lazily-loaded file tree state engine.
//!
//! The engine keeps an in-memory mirror of a filesystem subtree and the UI
//! state layered on it. Directories are resolved on first expansion, nodes
//! keep their id across reloads, change events patch only the affected
//! subtree, and single-child directory chains can be folded into one node.
//!
//! # Architecture
//!
//! - [`node`]: node store, id cache and compact folding
//! - [`decoration`]: per-node class lists composed from named overlays
//! - [`tree_model`]: the tree, its visible rows and coalesced render signal
//! - [`file_tree_service`]: child resolution, refresh and watch reconciliation
//! - [`model`]: selection, rename and create, clipboard, location, snapshots
//! - [`dnd`]: drag and drop
//!
//! # Examples
//!
//! ```
//! use filetree_core::{FileUri, TreeConfig};
//! use filetree_engine::FileTreeService;
//! use filetree_vfs::MemoryFsBuilder;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let fs = MemoryFsBuilder::new()
//!     .add_file("/w/src/lib.rs", "")
//!     .add_file("/w/Cargo.toml", "")
//!     .build()
//!     .unwrap();
//! let service = FileTreeService::new(Arc::new(fs), &TreeConfig::default());
//!
//! let root = service.init(&FileUri::file("/w"), None).await;
//! let names: Vec<String> = service
//!     .tree()
//!     .visible_nodes()
//!     .into_iter()
//!     .filter_map(|id| service.node(id))
//!     .map(|node| node.name().to_string())
//!     .collect();
//!
//! assert_eq!(names, ["src", "Cargo.toml"]);
//! assert!(service.tree().is_expanded(root));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod decoration;
pub mod dnd;
pub mod event;
pub mod file_tree_service;
pub mod model;
pub mod node;
pub mod scheduler;
pub mod sort;
pub mod tree_model;

pub use decoration::{Decoration, DecorationEngine, TargetMode};
pub use dnd::DragAndDropService;
pub use event::{Emitter, Subscription};
pub use file_tree_service::FileTreeService;
pub use model::{BatchOutcome, LocationTarget, ModelService, OperationFailure, PasteType};
pub use node::{Node, NodeKind, NodeStore};
pub use scheduler::{CoalescingDispatcher, Delayer, RenderEvent};
pub use tree_model::{TreeModel, Viewport};
