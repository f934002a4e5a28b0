//! User-facing orchestration over the file tree.
//!
//! [`ModelService`] owns the interaction state layered on top of the
//! [`FileTreeService`]: selection and focus decorations, rename and create
//! with validation, the cut/copy/paste buffer, "reveal and select" location
//! requests, and persistence of the expanded-directory snapshot.
//!
//! Three decoration sets interact. At most one node is focused; a focused
//! node is always selected; a node showing a context menu is never styled as
//! focused at the same time.

mod clipboard;
mod edit;
mod location;
mod naming;
mod selection;
mod snapshot;

pub use clipboard::{PasteBuffer, PasteType};
pub use location::LocationTarget;
pub use naming::{NamePrompt, copy_name, is_valid_basename};

use crate::decoration::{self, Decoration};
use crate::event::{Emitter, Subscription};
use crate::file_tree_service::FileTreeService;
use crate::node::Node;
use crate::scheduler::Delayer;
use crate::tree_model::TreeModel;
use filetree_core::traits::{FileTreeApi, SnapshotStorage};
use filetree_core::{Error, FileOperation, FileUri, NodeId, TreeConfig, WorkspaceId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, watch};

/// A filesystem call that failed, as published to error listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Operation that failed
    pub operation: FileOperation,
    /// Uri the operation targeted
    pub uri: FileUri,
    /// Message reported by the filesystem
    pub message: String,
}

impl OperationFailure {
    /// Builds a failure from an engine error.
    #[must_use]
    pub fn from_error(operation: FileOperation, uri: &FileUri, error: &Error) -> Self {
        let message = match error {
            Error::OperationFailed { message, .. } | Error::ResolveFailed { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        };
        Self {
            operation,
            uri: uri.clone(),
            message,
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to {} {}: {}", self.operation, self.uri, self.message)
    }
}

/// Result of an operation applied to several nodes.
///
/// One failing item never prevents the others from being attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Destinations of the items that succeeded
    pub succeeded: Vec<FileUri>,
    /// Items that failed
    pub failures: Vec<OperationFailure>,
}

impl BatchOutcome {
    /// Returns `true` if every item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug)]
struct ModelDecorations {
    selected: Decoration,
    focused: Decoration,
    context_menu: Decoration,
    cut: Decoration,
    loading: Decoration,
}

#[derive(Debug, Default)]
struct SelectionState {
    selected: Vec<NodeId>,
    focused: Option<NodeId>,
    context_menu: Option<NodeId>,
    suspended_focus: Option<NodeId>,
}

struct ModelInner {
    service: FileTreeService,
    storage: Arc<dyn SnapshotStorage>,
    workspace: Mutex<Option<WorkspaceId>>,
    decorations: ModelDecorations,
    selection: Mutex<SelectionState>,
    paste: Mutex<PasteBuffer>,
    location_delayer: Delayer,
    location_slot: Mutex<Option<(LocationTarget, oneshot::Sender<Option<NodeId>>)>>,
    snapshot_loaded: watch::Sender<bool>,
    on_operation_error: Emitter<OperationFailure>,
    render_subscription: Mutex<Option<Subscription>>,
}

/// Selection, editing, clipboard, location and snapshot orchestration.
///
/// Cloning yields another handle to the same model.
///
/// # Examples
///
/// ```no_run
/// use filetree_core::traits::FileTreeApi;
/// use filetree_core::{FileUri, MemorySnapshotStorage, TreeConfig};
/// use filetree_engine::ModelService;
/// use std::sync::Arc;
///
/// async fn reveal(api: Arc<dyn FileTreeApi>) {
///     let model = ModelService::new(api, Arc::new(MemorySnapshotStorage::new()), &TreeConfig::default());
///     model.init(&FileUri::file("/workspace"), None).await;
///
///     if let Some(id) = model.location(FileUri::file("/workspace/src/lib.rs")).await {
///         assert_eq!(model.selected_files(), vec![id]);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct ModelService {
    inner: Arc<ModelInner>,
}

impl ModelService {
    /// Creates a model over `api`, persisting snapshots to `storage`.
    #[must_use]
    pub fn new(
        api: Arc<dyn FileTreeApi>,
        storage: Arc<dyn SnapshotStorage>,
        config: &TreeConfig,
    ) -> Self {
        let service = FileTreeService::new(api, config);
        let decorations = ModelDecorations {
            selected: Decoration::new(decoration::SELECTED),
            focused: Decoration::new(decoration::FOCUSED),
            context_menu: Decoration::new(decoration::CONTEXT_MENU),
            cut: Decoration::new(decoration::CUT),
            loading: Decoration::new(decoration::LOADING),
        };
        let engine = service.tree().decorations();
        for decoration in [
            &decorations.selected,
            &decorations.focused,
            &decorations.context_menu,
            &decorations.cut,
            &decorations.loading,
        ] {
            engine.add_decoration(decoration);
        }

        let (snapshot_loaded, _) = watch::channel(false);
        let model = Self {
            inner: Arc::new(ModelInner {
                service,
                storage,
                workspace: Mutex::new(None),
                decorations,
                selection: Mutex::new(SelectionState::default()),
                paste: Mutex::new(PasteBuffer::default()),
                location_delayer: Delayer::new(config.location_delay()),
                location_slot: Mutex::new(None),
                snapshot_loaded,
                on_operation_error: Emitter::new(),
                render_subscription: Mutex::new(None),
            }),
        };

        let weak: Weak<ModelInner> = Arc::downgrade(&model.inner);
        let subscription = model.tree().on_render(move |event| {
            if !event.structural {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                Self { inner }.schedule_snapshot_save();
            }
        });
        *model.inner.render_subscription.lock() = Some(subscription);
        model
    }

    /// Opens the workspace rooted at `root_uri`.
    ///
    /// Resolves the root, replays the persisted snapshot, then starts
    /// watching the filesystem. Calling it again switches workspaces.
    pub async fn init(&self, root_uri: &FileUri, display_name: Option<String>) -> NodeId {
        self.inner.snapshot_loaded.send_replace(false);
        self.reset_interaction_state();
        let workspace = WorkspaceId::from_uri(root_uri);
        *self.inner.workspace.lock() = Some(workspace.clone());

        let root = self.inner.service.init(root_uri, display_name).await;

        match self.inner.storage.load(&workspace).await {
            Ok(Some(snapshot)) => self.replay_snapshot(&snapshot).await,
            Ok(None) => tracing::debug!(workspace = %workspace, "no snapshot stored"),
            Err(e) => tracing::warn!(workspace = %workspace, error = %e, "failed to load snapshot"),
        }
        self.inner.snapshot_loaded.send_replace(true);
        self.inner.service.start_watching();
        root
    }

    fn reset_interaction_state(&self) {
        *self.inner.selection.lock() = SelectionState::default();
        *self.inner.paste.lock() = PasteBuffer::default();
        let decorations = &self.inner.decorations;
        for decoration in [
            &decorations.selected,
            &decorations.focused,
            &decorations.context_menu,
            &decorations.cut,
            &decorations.loading,
        ] {
            decoration.clear_targets();
        }
    }

    /// The tree service underneath.
    #[must_use]
    pub fn service(&self) -> &FileTreeService {
        &self.inner.service
    }

    /// The tree.
    #[must_use]
    pub fn tree(&self) -> &TreeModel {
        self.inner.service.tree()
    }

    /// Clone of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.service.node(id)
    }

    /// Classes applying to `id`.
    #[must_use]
    pub fn classlist(&self, id: NodeId) -> Vec<String> {
        self.tree().classlist(id)
    }

    /// Registers a listener for failed filesystem calls.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_operation_error(
        &self,
        listener: impl Fn(&OperationFailure) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.on_operation_error.subscribe(listener)
    }

    pub(crate) fn report(&self, failure: &OperationFailure) {
        tracing::warn!(
            operation = %failure.operation,
            uri = %failure.uri,
            message = %failure.message,
            "file operation failed"
        );
        self.inner.on_operation_error.fire(failure);
    }

    /// Returns `true` once the persisted snapshot has been replayed.
    #[must_use]
    pub fn is_snapshot_loaded(&self) -> bool {
        *self.inner.snapshot_loaded.borrow()
    }

    async fn wait_for_snapshot(&self) {
        let mut loaded = self.inner.snapshot_loaded.subscribe();
        let _ = loaded.wait_for(|loaded| *loaded).await;
    }
}

impl fmt::Debug for ModelService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelService")
            .field("service", &self.inner.service)
            .field("workspace", &*self.inner.workspace.lock())
            .field("selection", &*self.inner.selection.lock())
            .field("paste", &*self.inner.paste.lock())
            .finish_non_exhaustive()
    }
}
