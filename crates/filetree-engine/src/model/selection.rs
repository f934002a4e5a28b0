//! Selection, focus and keyboard navigation.

use super::{ModelService, SelectionState};
use crate::decoration::TargetMode;
use crate::node::Node;
use filetree_core::NodeId;

impl ModelService {
    /// Selects and focuses `id` exclusively.
    pub fn active_file_decoration(&self, id: NodeId) {
        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        self.drop_context_menu(&mut state);
        for previous in state.selected.drain(..) {
            decorations.selected.remove_target(previous);
        }
        state.selected.push(id);
        decorations.selected.add_target(id, TargetMode::Self_);
        self.set_focus(&mut state, Some(id));
    }

    /// Selects `id` exclusively without giving it focus.
    pub fn select_file_decoration(&self, id: NodeId) {
        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        for previous in state.selected.drain(..) {
            decorations.selected.remove_target(previous);
        }
        self.set_focus(&mut state, None);
        state.selected.push(id);
        decorations.selected.add_target(id, TargetMode::Self_);
    }

    /// Adds `id` to the selection or removes it, like a checkbox.
    ///
    /// A newly added node takes the focus; removing the focused node drops
    /// the focus.
    pub fn toggle_file_selected_decoration(&self, id: NodeId) {
        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        if let Some(index) = state.selected.iter().position(|selected| *selected == id) {
            state.selected.remove(index);
            decorations.selected.remove_target(id);
            if state.focused == Some(id) {
                self.set_focus(&mut state, None);
            }
        } else {
            state.selected.push(id);
            decorations.selected.add_target(id, TargetMode::Self_);
            self.set_focus(&mut state, Some(id));
        }
    }

    /// Selects every visible node between two visible indices, inclusive.
    ///
    /// The focus stays where it was if it lies inside the range.
    pub fn active_file_decoration_by_range(&self, begin: usize, end: usize) {
        let (low, high) = if begin <= end { (begin, end) } else { (end, begin) };
        let tree = self.tree();
        let range: Vec<NodeId> = (low..=high).filter_map(|index| tree.node_at_index(index)).collect();

        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        for previous in state.selected.drain(..) {
            decorations.selected.remove_target(previous);
        }
        for id in &range {
            decorations.selected.add_target(*id, TargetMode::Self_);
        }
        if state.focused.is_some_and(|focused| !range.contains(&focused)) {
            self.set_focus(&mut state, None);
        }
        state.selected = range;
    }

    /// Shift-click: selects from the focused node (or the first selected
    /// one) to `id`.
    pub fn handle_item_range_click(&self, id: NodeId) {
        let tree = self.tree();
        let Some(target) = tree.index_of(id) else {
            return;
        };
        let anchor = {
            let state = self.inner.selection.lock();
            state
                .focused
                .or_else(|| state.selected.first().copied())
                .and_then(|anchor| tree.index_of(anchor))
        };
        match anchor {
            Some(anchor) => self.active_file_decoration_by_range(anchor, target),
            None => self.active_file_decoration(id),
        }
    }

    /// Clears the selection and the focus.
    pub fn clear_file_selected_decoration(&self) {
        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        for previous in state.selected.drain(..) {
            decorations.selected.remove_target(previous);
        }
        self.set_focus(&mut state, None);
    }

    /// Drops the focus and keeps the selection, as when the tree loses focus.
    pub fn enactive_file_decoration(&self) {
        let mut state = self.inner.selection.lock();
        self.set_focus(&mut state, None);
    }

    // The context-menu target never shows focus styling; its focus is held
    // back until the menu closes.
    fn set_focus(&self, state: &mut SelectionState, id: Option<NodeId>) {
        let focused = &self.inner.decorations.focused;
        if let Some(previous) = state.focused.take() {
            focused.remove_target(previous);
        }
        state.suspended_focus = None;
        state.focused = id;
        match id {
            Some(id) if state.context_menu == Some(id) => state.suspended_focus = Some(id),
            Some(id) => focused.add_target(id, TargetMode::Self_),
            None => {}
        }
    }

    /// Marks `id` as the context-menu target, suspending the focus styling.
    pub fn handle_context_menu(&self, id: NodeId) {
        let decorations = &self.inner.decorations;
        let mut state = self.inner.selection.lock();
        self.drop_context_menu(&mut state);
        if let Some(focused) = state.focused {
            decorations.focused.remove_target(focused);
            state.suspended_focus = Some(focused);
        }
        state.context_menu = Some(id);
        decorations.context_menu.add_target(id, TargetMode::Self_);
    }

    /// Clears the context-menu target and restores the focus styling.
    pub fn handle_context_menu_close(&self) {
        let mut state = self.inner.selection.lock();
        self.drop_context_menu(&mut state);
    }

    fn drop_context_menu(&self, state: &mut SelectionState) {
        if let Some(previous) = state.context_menu.take() {
            self.inner.decorations.context_menu.remove_target(previous);
        }
        if let Some(suspended) = state.suspended_focus.take()
            && state.focused == Some(suspended)
        {
            self.inner
                .decorations
                .focused
                .add_target(suspended, TargetMode::Self_);
        }
    }

    /// Moves the focus to the next visible node.
    pub fn move_to_next(&self) {
        self.move_focus(|index, count| (index + 1).min(count - 1), 0);
    }

    /// Moves the focus to the previous visible node.
    pub fn move_to_prev(&self) {
        self.move_focus(|index, _| index.saturating_sub(1), usize::MAX);
    }

    fn move_focus(&self, step: impl Fn(usize, usize) -> usize, start: usize) {
        let tree = self.tree();
        let count = tree.visible_count();
        if count == 0 {
            return;
        }
        let current = self.focused_file().and_then(|focused| tree.index_of(focused));
        let next = current.map_or_else(|| start.min(count - 1), |index| step(index, count));
        if let Some(id) = tree.node_at_index(next) {
            self.active_file_decoration(id);
            tree.ensure_visible(id);
        }
    }

    /// Expands the focused directory.
    pub async fn expand_current(&self) -> bool {
        let Some(focused) = self.focused_file() else {
            return false;
        };
        self.service().expand(focused).await
    }

    /// Collapses the focused directory, or the parent of the focused node
    /// when there is nothing to collapse, moving the focus there.
    pub fn collapse_current(&self) -> bool {
        let Some(focused) = self.focused_file().and_then(|id| self.node(id)) else {
            return false;
        };
        if focused.is_directory() && focused.is_expanded() {
            return self.service().collapse(focused.id());
        }
        let Some(parent) = focused.parent().filter(|parent| Some(*parent) != self.tree().root())
        else {
            return false;
        };
        let collapsed = self.service().collapse(parent);
        self.active_file_decoration(parent);
        self.tree().ensure_visible(parent);
        collapsed
    }

    /// Collapses every directory.
    pub fn collapse_all(&self) {
        let expanded: Vec<NodeId> = self.tree().with_store(|store| {
            store
                .ids()
                .filter(|id| store.get(*id).is_some_and(Node::is_expanded))
                .collect()
        });
        for id in expanded {
            self.service().collapse(id);
        }
    }

    /// Selected nodes that are still live, in selection order.
    #[must_use]
    pub fn selected_files(&self) -> Vec<NodeId> {
        let selected = self.inner.selection.lock().selected.clone();
        self.tree().with_store(|store| {
            selected
                .into_iter()
                .filter(|id| store.contains(*id))
                .collect()
        })
    }

    /// The focused node, if it is still live.
    #[must_use]
    pub fn focused_file(&self) -> Option<NodeId> {
        let focused = self.inner.selection.lock().focused?;
        self.tree().with_store(|store| store.contains(focused)).then_some(focused)
    }

    /// The node a context menu was opened on.
    #[must_use]
    pub fn context_menu_file(&self) -> Option<NodeId> {
        self.inner.selection.lock().context_menu
    }
}
