//! The observable tree: node store, visible branch and render coalescing.
//!
//! [`TreeModel`] owns the [`NodeStore`] behind a lock and keeps a flattened
//! list of the visible nodes so index lookups are O(1). Structural changes
//! invalidate the list and request a render through the
//! [`CoalescingDispatcher`]; decoration changes request a non-structural one.
//!
//! The root is hidden. Visible iteration starts at its first child and
//! descends into expanded, loaded directories.

use crate::decoration::DecorationEngine;
use crate::event::Subscription;
use crate::node::{Node, NodeStore};
use crate::scheduler::{CoalescingDispatcher, RenderEvent};
use filetree_core::{NodeId, TreeConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Scroll state of the list rendering the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Offset of the first rendered pixel
    pub scroll_offset: f64,
    /// Visible height; zero when unknown
    pub height: f64,
    /// Height of one row
    pub item_height: f64,
}

impl Viewport {
    /// Creates a viewport scrolled to the top.
    #[must_use]
    pub const fn new(height: f64, item_height: f64) -> Self {
        Self {
            scroll_offset: 0.0,
            height,
            item_height,
        }
    }

    /// Returns `true` if the row at `index` is fully visible.
    #[must_use]
    pub fn is_visible(&self, index: usize) -> bool {
        let top = self.row_top(index);
        top >= self.scroll_offset && top + self.item_height <= self.scroll_offset + self.height
    }

    /// Scrolls so the row at `index` is centered, if it is not visible.
    ///
    /// With an unknown height the row is scrolled to the top. Returns `true`
    /// if the offset changed.
    pub fn ensure_visible(&mut self, index: usize, row_count: usize) -> bool {
        let top = self.row_top(index);
        let target = if self.height <= 0.0 {
            top
        } else if self.is_visible(index) {
            return false;
        } else {
            let centered = top - (self.height - self.item_height) / 2.0;
            let max = (self.row_top(row_count) - self.height).max(0.0);
            centered.clamp(0.0, max)
        };
        let changed = (target - self.scroll_offset).abs() > f64::EPSILON;
        self.scroll_offset = target;
        changed
    }

    #[allow(clippy::cast_precision_loss)]
    fn row_top(&self, index: usize) -> f64 {
        index as f64 * self.item_height
    }
}

#[derive(Debug, Default)]
struct Branch {
    nodes: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
}

impl Branch {
    fn flatten(store: &NodeStore) -> Self {
        let mut nodes = Vec::new();
        let mut stack: Vec<NodeId> = store
            .root_node()
            .and_then(Node::children)
            .map(|children| children.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            let Some(node) = store.get(id) else {
                continue;
            };
            nodes.push(id);
            if node.is_expanded()
                && let Some(children) = node.children()
            {
                stack.extend(children.iter().rev());
            }
        }

        let index = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { nodes, index }
    }
}

#[derive(Debug)]
struct TreeState {
    store: NodeStore,
    branch: Option<Branch>,
    viewport: Viewport,
}

impl TreeState {
    fn branch(&mut self) -> &Branch {
        let store = &self.store;
        self.branch.get_or_insert_with(|| Branch::flatten(store))
    }
}

struct TreeModelInner {
    state: Mutex<TreeState>,
    decorations: DecorationEngine,
    dispatcher: Arc<CoalescingDispatcher>,
    _redraw: Subscription,
}

/// Shared handle to the tree.
///
/// # Examples
///
/// ```
/// use filetree_core::{FileStat, FileUri, TreeConfig};
/// use filetree_engine::tree_model::TreeModel;
///
/// let tree = TreeModel::new(&TreeConfig::default());
/// let a = tree.update(|store| {
///     let root = store.create_root(FileStat::directory(FileUri::file("/w")), None);
///     let a = store.to_node(FileStat::file(FileUri::file("/w/a.txt")), root, None);
///     store.set_children(root, Some(vec![a]));
///     a
/// });
///
/// assert_eq!(tree.visible_nodes(), vec![a]);
/// assert_eq!(tree.index_of(a), Some(0));
/// ```
#[derive(Clone)]
pub struct TreeModel {
    inner: Arc<TreeModelInner>,
}

impl TreeModel {
    /// Creates an empty tree.
    #[must_use]
    pub fn new(config: &TreeConfig) -> Self {
        let dispatcher = Arc::new(CoalescingDispatcher::new(config.render_delay()));
        let decorations = DecorationEngine::new();
        let redraw_target = Arc::clone(&dispatcher);
        let redraw = decorations.on_did_change(move |()| redraw_target.dispatch(false));

        Self {
            inner: Arc::new(TreeModelInner {
                state: Mutex::new(TreeState {
                    store: NodeStore::new(),
                    branch: None,
                    viewport: Viewport::new(config.viewport_height, config.item_height),
                }),
                decorations,
                dispatcher,
                _redraw: redraw,
            }),
        }
    }

    /// Reads the node store.
    pub fn with_store<R>(&self, f: impl FnOnce(&NodeStore) -> R) -> R {
        f(&self.inner.state.lock().store)
    }

    /// Mutates the node store and invalidates the visible branch.
    ///
    /// Does not request a render; see [`dispatch_change`](Self::dispatch_change).
    pub fn update<R>(&self, f: impl FnOnce(&mut NodeStore) -> R) -> R {
        let mut state = self.inner.state.lock();
        state.branch = None;
        f(&mut state.store)
    }

    /// Clone of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.with_store(|store| store.get(id).cloned())
    }

    /// Root id.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.with_store(NodeStore::root)
    }

    /// Requests a structural render.
    pub fn dispatch_change(&self) {
        self.inner.dispatcher.dispatch(true);
    }

    /// Requests a redraw without structural change.
    pub fn dispatch_redraw(&self) {
        self.inner.dispatcher.dispatch(false);
    }

    /// Renders now instead of waiting for the coalescing window.
    pub fn flush_render(&self) {
        self.inner.dispatcher.flush();
    }

    /// Returns `true` while a render is pending.
    #[must_use]
    pub fn is_render_pending(&self) -> bool {
        self.inner.dispatcher.is_pending()
    }

    /// Registers a render listener.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_render(
        &self,
        listener: impl Fn(&RenderEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.dispatcher.on_render(listener)
    }

    /// Sets the expanded flag of a directory.
    ///
    /// Returns `true` if it changed; a render is requested in that case.
    pub fn set_expanded(&self, id: NodeId, expanded: bool) -> bool {
        let changed = {
            let mut state = self.inner.state.lock();
            let changed = state.store.set_expanded(id, expanded);
            if changed {
                state.branch = None;
            }
            changed
        };
        if changed {
            self.dispatch_change();
        }
        changed
    }

    /// Returns `true` if `id` is an expanded directory.
    #[must_use]
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.with_store(|store| store.get(id).is_some_and(Node::is_expanded))
    }

    /// Visible nodes in display order.
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.inner.state.lock().branch().nodes.clone()
    }

    /// Number of visible nodes.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.inner.state.lock().branch().nodes.len()
    }

    /// Visible node at `index`.
    #[must_use]
    pub fn node_at_index(&self, index: usize) -> Option<NodeId> {
        self.inner.state.lock().branch().nodes.get(index).copied()
    }

    /// Visible index of `id`; `None` if hidden or unknown.
    #[must_use]
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.inner.state.lock().branch().index.get(&id).copied()
    }

    /// The decoration engine of this tree.
    #[must_use]
    pub fn decorations(&self) -> &DecorationEngine {
        &self.inner.decorations
    }

    /// Classes applying to `id`.
    #[must_use]
    pub fn classlist(&self, id: NodeId) -> Vec<String> {
        let ancestors = self.with_store(|store| store.ancestors(id));
        self.inner.decorations.get_decorations(id, &ancestors)
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.inner.state.lock().viewport
    }

    /// Sets the visible height.
    pub fn set_viewport_height(&self, height: f64) {
        self.inner.state.lock().viewport.height = height.max(0.0);
    }

    /// Sets the scroll offset.
    pub fn scroll_to(&self, offset: f64) {
        self.inner.state.lock().viewport.scroll_offset = offset.max(0.0);
        self.dispatch_redraw();
    }

    /// Scrolls `id` into view.
    ///
    /// Returns `false` if the node is not visible.
    pub fn ensure_visible(&self, id: NodeId) -> bool {
        let scrolled = {
            let mut state = self.inner.state.lock();
            let (index, count) = {
                let branch = state.branch();
                (branch.index.get(&id).copied(), branch.nodes.len())
            };
            let Some(index) = index else {
                return false;
            };
            state.viewport.ensure_visible(index, count)
        };
        if scrolled {
            self.dispatch_redraw();
        }
        true
    }
}

impl fmt::Debug for TreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TreeModel")
            .field("nodes", &state.store.len())
            .field("viewport", &state.viewport)
            .field("decorations", &self.inner.decorations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{Decoration, TargetMode};
    use filetree_core::{FileStat, FileUri};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn dir(path: &str) -> FileStat {
        FileStat::directory(FileUri::file(path))
    }

    fn file(path: &str) -> FileStat {
        FileStat::file(FileUri::file(path))
    }

    // /w
    //   src/
    //     lib.rs
    //   README.md
    fn sample() -> (TreeModel, NodeId, NodeId, NodeId) {
        let tree = TreeModel::new(&TreeConfig::default());
        let ids = tree.update(|store| {
            let root = store.create_root(dir("/w"), None);
            let src = store.to_node(dir("/w/src"), root, None);
            let readme = store.to_node(file("/w/README.md"), root, None);
            store.set_children(root, Some(vec![readme, src]));
            let lib = store.to_node(file("/w/src/lib.rs"), src, None);
            store.set_children(src, Some(vec![lib]));
            (src, lib, readme)
        });
        (tree, ids.0, ids.1, ids.2)
    }

    #[test]
    fn test_collapsed_directories_hide_children() {
        let (tree, src, _lib, readme) = sample();
        assert_eq!(tree.visible_nodes(), vec![src, readme]);
        assert_eq!(tree.node_at_index(1), Some(readme));
    }

    #[test]
    fn test_expand_shows_children() {
        let (tree, src, lib, readme) = sample();
        assert!(tree.set_expanded(src, true));
        assert!(!tree.set_expanded(src, true));
        assert_eq!(tree.visible_nodes(), vec![src, lib, readme]);
        assert_eq!(tree.index_of(readme), Some(2));

        tree.set_expanded(src, false);
        assert_eq!(tree.index_of(lib), None);
        assert_eq!(tree.visible_count(), 2);
    }

    #[test]
    fn test_root_cannot_collapse() {
        let (tree, ..) = sample();
        let root = tree.root().unwrap();
        assert!(!tree.set_expanded(root, false));
        assert!(tree.is_expanded(root));
    }

    #[test]
    fn test_classlist_uses_ancestors() {
        let (tree, src, lib, _) = sample();
        let over = Decoration::new("over");
        tree.decorations().add_decoration(&over);
        over.add_target(src, TargetMode::SelfAndChildren);

        assert_eq!(tree.classlist(lib), vec!["over"]);
    }

    #[test]
    fn test_viewport_centers_hidden_row() {
        let mut viewport = Viewport::new(100.0, 10.0);
        assert!(!viewport.ensure_visible(3, 50));
        assert!(viewport.ensure_visible(30, 50));
        assert!((viewport.scroll_offset - 255.0).abs() < f64::EPSILON);
        assert!(viewport.is_visible(30));
    }

    #[test]
    fn test_viewport_clamps_to_end() {
        let mut viewport = Viewport::new(100.0, 10.0);
        viewport.ensure_visible(19, 20);
        assert!((viewport.scroll_offset - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_viewport_unknown_height_scrolls_to_row() {
        let mut viewport = Viewport::new(0.0, 22.0);
        assert!(viewport.ensure_visible(2, 5));
        assert!((viewport.scroll_offset - 44.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoration_change_requests_one_redraw() {
        let (tree, src, lib, _) = sample();
        let renders = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&renders);
        let _sub = tree.on_render(move |event| {
            assert!(!event.structural);
            sink.fetch_add(1, Ordering::SeqCst);
        });

        let selected = Decoration::new("selected");
        tree.decorations().add_decoration(&selected);
        selected.add_target(src, TargetMode::Self_);
        selected.add_target(lib, TargetMode::Self_);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }
}
