//! Composable, multi-owner decoration state.
//!
//! A [`Decoration`] is a named overlay (a CSS-like class) owning a set of
//! target nodes. Each target is applied either to the node alone or to the
//! node and every descendant. The [`DecorationEngine`] merges all registered
//! decorations into one classlist per node, in registration order.
//!
//! # Examples
//!
//! ```
//! use filetree_core::NodeId;
//! use filetree_engine::decoration::{Decoration, DecorationEngine, TargetMode};
//!
//! let engine = DecorationEngine::new();
//! let selected = Decoration::new("mod_selected");
//! let dragover = Decoration::new("mod_dragover");
//! engine.add_decoration(&selected);
//! engine.add_decoration(&dragover);
//!
//! let dir = NodeId::new(1);
//! let child = NodeId::new(2);
//! selected.add_target(child, TargetMode::Self_);
//! dragover.add_target(dir, TargetMode::SelfAndChildren);
//!
//! // `child` sits under `dir`, so it picks up the cascading decoration.
//! assert_eq!(
//!     engine.get_decorations(child, &[dir]),
//!     vec!["mod_selected", "mod_dragover"]
//! );
//! assert_eq!(engine.get_decorations(dir, &[]), vec!["mod_dragover"]);
//! ```

use crate::event::{Emitter, Subscription};
use filetree_core::NodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Selected nodes.
pub const SELECTED: &str = "mod_selected";
/// The focused node.
pub const FOCUSED: &str = "mod_focused";
/// Node a context menu was opened on.
pub const CONTEXT_MENU: &str = "mod_actived";
/// Nodes in the cut buffer.
pub const CUT: &str = "mod_cut";
/// Nodes with a filesystem operation in flight.
pub const LOADING: &str = "mod_loading";
/// Nodes being dragged.
pub const DRAGGING: &str = "mod_dragging";
/// Directory hovered by a drag.
pub const DRAG_OVER: &str = "mod_dragover";

/// How far a decoration target reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetMode {
    /// Only the target node
    Self_,
    /// The target node and all its descendants
    SelfAndChildren,
}

#[derive(Debug, Default)]
struct DecorationState {
    targets: HashMap<NodeId, TargetMode>,
    disabled: bool,
}

struct DecorationInner {
    class_name: String,
    state: Mutex<DecorationState>,
    on_did_change: Emitter<()>,
}

/// A named overlay applied to a set of nodes.
///
/// Cloning yields another handle to the same decoration.
#[derive(Clone)]
pub struct Decoration {
    inner: Arc<DecorationInner>,
}

impl Decoration {
    /// Creates a decoration without targets.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DecorationInner {
                class_name: class_name.into(),
                state: Mutex::new(DecorationState::default()),
                on_did_change: Emitter::new(),
            }),
        }
    }

    /// Class applied to decorated nodes.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    /// Adds or updates a target.
    pub fn add_target(&self, id: NodeId, mode: TargetMode) {
        let changed = self.inner.state.lock().targets.insert(id, mode) != Some(mode);
        if changed {
            self.inner.on_did_change.fire(&());
        }
    }

    /// Removes a target. Removing an absent target does nothing.
    pub fn remove_target(&self, id: NodeId) {
        let removed = self.inner.state.lock().targets.remove(&id).is_some();
        if removed {
            self.inner.on_did_change.fire(&());
        }
    }

    /// Returns `true` if `id` is a direct target.
    #[must_use]
    pub fn has_target(&self, id: NodeId) -> bool {
        self.inner.state.lock().targets.contains_key(&id)
    }

    /// Removes every target.
    pub fn clear_targets(&self) {
        let had_targets = {
            let mut state = self.inner.state.lock();
            let had = !state.targets.is_empty();
            state.targets.clear();
            had
        };
        if had_targets {
            self.inner.on_did_change.fire(&());
        }
    }

    /// Current targets, in no particular order.
    #[must_use]
    pub fn targets(&self) -> Vec<NodeId> {
        self.inner.state.lock().targets.keys().copied().collect()
    }

    /// Enables or disables the decoration without touching its targets.
    pub fn set_disabled(&self, disabled: bool) {
        let changed = {
            let mut state = self.inner.state.lock();
            let changed = state.disabled != disabled;
            state.disabled = disabled;
            changed
        };
        if changed {
            self.inner.on_did_change.fire(&());
        }
    }

    /// Returns `true` if the decoration is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.inner.state.lock().disabled
    }

    /// Returns `true` if the decoration reaches `id`, given its ancestors.
    #[must_use]
    pub fn applies_to(&self, id: NodeId, ancestors: &[NodeId]) -> bool {
        let state = self.inner.state.lock();
        if state.disabled {
            return false;
        }
        if state.targets.contains_key(&id) {
            return true;
        }
        ancestors
            .iter()
            .any(|ancestor| state.targets.get(ancestor) == Some(&TargetMode::SelfAndChildren))
    }

    /// Registers a listener called whenever targets or the disabled flag change.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_did_change(&self, listener: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
        self.inner.on_did_change.subscribe(listener)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Decoration")
            .field("class_name", &self.inner.class_name)
            .field("targets", &state.targets.len())
            .field("disabled", &state.disabled)
            .finish()
    }
}

struct Registered {
    decoration: Decoration,
    _subscription: Subscription,
}

/// Ordered set of decorations producing per-node classlists.
pub struct DecorationEngine {
    decorations: Mutex<Vec<Registered>>,
    on_did_change: Emitter<()>,
}

impl DecorationEngine {
    /// Creates an engine without decorations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decorations: Mutex::new(Vec::new()),
            on_did_change: Emitter::new(),
        }
    }

    /// Registers a decoration. Registering it twice has no effect.
    pub fn add_decoration(&self, decoration: &Decoration) {
        {
            let mut decorations = self.decorations.lock();
            if decorations.iter().any(|r| r.decoration.same(decoration)) {
                return;
            }
            let emitter = self.on_did_change.clone();
            let subscription = decoration.on_did_change(move |()| emitter.fire(&()));
            decorations.push(Registered {
                decoration: decoration.clone(),
                _subscription: subscription,
            });
        }
        self.on_did_change.fire(&());
    }

    /// Unregisters a decoration.
    pub fn remove_decoration(&self, decoration: &Decoration) {
        let removed = {
            let mut decorations = self.decorations.lock();
            let before = decorations.len();
            decorations.retain(|r| !r.decoration.same(decoration));
            before != decorations.len()
        };
        if removed {
            self.on_did_change.fire(&());
        }
    }

    /// Classes applying to `id`, in registration order.
    ///
    /// `ancestors` lists the node's ancestors; cascading targets are matched
    /// against it.
    #[must_use]
    pub fn get_decorations(&self, id: NodeId, ancestors: &[NodeId]) -> Vec<String> {
        self.decorations
            .lock()
            .iter()
            .filter(|r| r.decoration.applies_to(id, ancestors))
            .map(|r| r.decoration.class_name().to_string())
            .collect()
    }

    /// Number of registered decorations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decorations.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decorations.lock().is_empty()
    }

    /// Registers a listener called when any registered decoration changes.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_did_change(&self, listener: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
        self.on_did_change.subscribe(listener)
    }
}

impl Default for DecorationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DecorationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decorations = self.decorations.lock();
        let names: Vec<&str> = decorations
            .iter()
            .map(|r| r.decoration.class_name())
            .collect();
        f.debug_struct("DecorationEngine")
            .field("decorations", &names)
            .finish()
    }
}
