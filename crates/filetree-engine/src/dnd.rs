//! Drag and drop between directories of the tree.
//!
//! Dragging marks the move-set with the dragging decoration; hovering a
//! directory highlights it with its whole subtree and, after a delay,
//! expands it. Dropping moves the reduced move-set into the hovered
//! directory.

use crate::decoration::{self, Decoration, TargetMode};
use crate::model::{BatchOutcome, ModelService, OperationFailure};
use crate::node::Node;
use crate::scheduler::Delayer;
use filetree_core::{FileOperation, NodeId, Result, TreeConfig};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default)]
struct DragState {
    dragged: Vec<NodeId>,
    over: Option<NodeId>,
}

struct DndInner {
    model: ModelService,
    dragging: Decoration,
    drag_over: Decoration,
    hover: Delayer,
    state: Mutex<DragState>,
}

/// Drag and drop handlers over a [`ModelService`].
#[derive(Clone)]
pub struct DragAndDropService {
    inner: Arc<DndInner>,
}

impl DragAndDropService {
    /// Creates the service and registers its decorations on the model's tree.
    #[must_use]
    pub fn new(model: ModelService, config: &TreeConfig) -> Self {
        let dragging = Decoration::new(decoration::DRAGGING);
        let drag_over = Decoration::new(decoration::DRAG_OVER);
        let engine = model.tree().decorations();
        engine.add_decoration(&dragging);
        engine.add_decoration(&drag_over);

        Self {
            inner: Arc::new(DndInner {
                model,
                dragging,
                drag_over,
                hover: Delayer::new(config.drag_hover_expand_delay()),
                state: Mutex::new(DragState::default()),
            }),
        }
    }

    /// Starts dragging `id`.
    ///
    /// The whole selection is dragged if it contains `id`, else only `id`.
    pub fn handle_drag_start(&self, id: NodeId) {
        let selected = self.inner.model.selected_files();
        let dragged = if selected.contains(&id) {
            selected
        } else {
            vec![id]
        };

        self.inner.dragging.clear_targets();
        for node in &dragged {
            self.inner.dragging.add_target(*node, TargetMode::Self_);
        }
        tracing::debug!(count = dragged.len(), "drag started");
        self.inner.state.lock().dragged = dragged;
    }

    /// The nodes being dragged.
    #[must_use]
    pub fn dragged(&self) -> Vec<NodeId> {
        self.inner.state.lock().dragged.clone()
    }

    /// The pointer entered `id`.
    pub fn handle_drag_enter(&self, id: NodeId) -> bool {
        self.handle_drag_over(id)
    }

    /// The pointer hovers `id`.
    ///
    /// Highlights the directory that would receive the drop and schedules
    /// its expansion. Returns `false` if dropping there is not allowed,
    /// which is the case for the dragged nodes and anything inside them.
    pub fn handle_drag_over(&self, id: NodeId) -> bool {
        let Some(container) = self.drop_container(id) else {
            self.clear_hover();
            return false;
        };

        let mut state = self.inner.state.lock();
        if state.over == Some(container.id()) {
            return true;
        }
        state.over = Some(container.id());
        drop(state);

        self.inner.hover.cancel();
        self.inner.drag_over.clear_targets();
        if container.parent().is_some() {
            self.inner
                .drag_over
                .add_target(container.id(), TargetMode::SelfAndChildren);
        }
        if !container.is_expanded() {
            let weak = Arc::downgrade(&self.inner);
            let target = container.id();
            self.inner.hover.trigger(async move {
                if let Some(inner) = weak.upgrade() {
                    tracing::debug!(node = %target, "expanding hovered directory");
                    inner.model.service().expand(target).await;
                }
            });
        }
        true
    }

    /// The pointer left `id`.
    pub fn handle_drag_leave(&self, id: NodeId) {
        let over = self.inner.state.lock().over;
        let container = self.drop_container(id).map(|node| node.id());
        if over.is_none() || over == container {
            self.clear_hover();
        }
    }

    fn clear_hover(&self) {
        self.inner.hover.cancel();
        self.inner.drag_over.clear_targets();
        self.inner.state.lock().over = None;
    }

    /// Dragging ended without a drop, or after one.
    pub fn handle_drag_end(&self) {
        self.clear_hover();
        self.inner.dragging.clear_targets();
        self.inner.state.lock().dragged.clear();
    }

    /// Drops the dragged nodes on `target`, or on its parent if it is a file.
    ///
    /// Nodes inside another dragged node travel with it and get no move of
    /// their own. Nodes already in the target directory are skipped. Every
    /// remaining node is attempted even if an earlier one failed.
    ///
    /// # Errors
    ///
    /// Returns [`filetree_core::Error::ResourceNotFound`] if the target is
    /// gone. Failures of individual items are reported in the outcome.
    pub async fn handle_drop(&self, target: NodeId) -> Result<BatchOutcome> {
        let model = &self.inner.model;
        let container = model.directory_of(target)?;
        let dragged = std::mem::take(&mut self.inner.state.lock().dragged);
        self.handle_drag_end();

        let mut outcome = BatchOutcome::default();
        if !self.accepts(&container, &dragged) {
            tracing::debug!(target = %container.path(), "drop into a dragged node rejected");
            return Ok(outcome);
        }

        let service = model.service();
        if !container.is_loaded() {
            service.load_children(container.id()).await;
        }
        for node in self.reduce(&dragged) {
            if node.parent() == Some(container.id()) {
                continue;
            }
            let from = model.head_uri(&node);
            let name = node.head_name().to_string();
            let to = container.uri().join(&name);

            service.ignore_move(&from, &to);
            match service.api().mv(&from, &to).await {
                Ok(()) => {
                    service.move_node(node.id(), container.id(), &name);
                    outcome.succeeded.push(to);
                }
                Err(e) => {
                    service.unignore(&[from.clone(), to]);
                    outcome
                        .failures
                        .push(OperationFailure::from_error(FileOperation::Move, &from, &e));
                }
            }
        }

        service.expand(container.id()).await;
        for failure in &outcome.failures {
            model.report(failure);
        }
        Ok(outcome)
    }

    // Live dragged nodes that are not inside another dragged node.
    fn reduce(&self, dragged: &[NodeId]) -> Vec<Node> {
        self.inner.model.tree().with_store(|store| {
            dragged
                .iter()
                .filter(|id| {
                    !dragged
                        .iter()
                        .any(|other| other != *id && store.is_ancestor(*other, **id))
                })
                .filter_map(|id| store.get(*id).cloned())
                .collect()
        })
    }

    fn drop_container(&self, id: NodeId) -> Option<Node> {
        let container = self.inner.model.directory_of(id).ok()?;
        let dragged = self.inner.state.lock().dragged.clone();
        self.accepts(&container, &dragged).then_some(container)
    }

    fn accepts(&self, container: &Node, dragged: &[NodeId]) -> bool {
        self.inner.model.tree().with_store(|store| {
            !dragged
                .iter()
                .any(|id| *id == container.id() || store.is_ancestor(*id, container.id()))
        })
    }
}

impl fmt::Debug for DragAndDropService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragAndDropService")
            .field("state", &*self.inner.state.lock())
            .field("hover_pending", &self.inner.hover.is_pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetree_core::{FileUri, MemorySnapshotStorage};
    use filetree_vfs::{MemoryFileSystem, MemoryFsBuilder};
    use std::time::Duration;

    async fn setup() -> (Arc<MemoryFileSystem>, ModelService, DragAndDropService) {
        let fs = Arc::new(
            MemoryFsBuilder::new()
                .add_file("/ws/a/one.txt", "")
                .add_file("/ws/a/two.txt", "")
                .add_file("/ws/t/keep.txt", "")
                .add_file("/ws/loose.txt", "")
                .build()
                .unwrap(),
        );
        let config = TreeConfig {
            compact_folders: false,
            ..TreeConfig::default()
        };
        let model = ModelService::new(fs.clone(), Arc::new(MemorySnapshotStorage::new()), &config);
        model.init(&FileUri::file("/ws"), None).await;
        let dnd = DragAndDropService::new(model.clone(), &config);
        (fs, model, dnd)
    }

    fn id(model: &ModelService, path: &str) -> NodeId {
        model.service().get_node_by_path(path).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_unselected_node_moves_alone() {
        let (_fs, model, dnd) = setup().await;
        let a = id(&model, "/ws/a");
        let loose = id(&model, "/ws/loose.txt");
        model.active_file_decoration(a);

        dnd.handle_drag_start(loose);
        assert_eq!(dnd.dragged(), vec![loose]);
        assert!(model.classlist(loose).contains(&decoration::DRAGGING.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_over_rejects_dragged_subtree() {
        let (_fs, model, dnd) = setup().await;
        let a = id(&model, "/ws/a");
        model.service().expand(a).await;
        let one = id(&model, "/ws/a/one.txt");

        dnd.handle_drag_start(a);
        assert!(!dnd.handle_drag_over(a));
        assert!(!dnd.handle_drag_over(one));
        assert!(dnd.handle_drag_over(id(&model, "/ws/t")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_expands_after_delay_unless_left() {
        let (_fs, model, dnd) = setup().await;
        let loose = id(&model, "/ws/loose.txt");
        let t = id(&model, "/ws/t");
        let a = id(&model, "/ws/a");

        dnd.handle_drag_start(loose);
        assert!(dnd.handle_drag_over(a));
        dnd.handle_drag_leave(a);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!model.tree().is_expanded(a));

        assert!(dnd.handle_drag_over(t));
        assert!(model.classlist(t).contains(&decoration::DRAG_OVER.to_string()));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(model.tree().is_expanded(t));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_collects_failures_and_continues() {
        let (fs, model, dnd) = setup().await;
        let a = id(&model, "/ws/a");
        model.service().expand(a).await;
        let one = id(&model, "/ws/a/one.txt");
        let two = id(&model, "/ws/a/two.txt");
        let t = id(&model, "/ws/t");
        model.service().expand(t).await;
        fs.inject_failure(FileOperation::Move, "/ws/a/one.txt", "locked")
            .unwrap();

        model.active_file_decoration(one);
        model.toggle_file_selected_decoration(two);
        dnd.handle_drag_start(two);
        let outcome = dnd.handle_drop(t).await.unwrap();

        assert_eq!(outcome.succeeded, vec![FileUri::file("/ws/t/two.txt")]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].message, "locked");
        assert_eq!(model.node(two).unwrap().path(), "/ws/t/two.txt");
        assert_eq!(model.node(one).unwrap().path(), "/ws/a/one.txt");
        assert!(model.tree().is_expanded(t));
        assert!(dnd.dragged().is_empty());
    }
}
