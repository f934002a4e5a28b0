//! "Reveal and select" requests.
//!
//! Location requests go through a single slot behind a short delay: when
//! several arrive inside the window only the last one is applied and the
//! earlier callers get `None`. Before applying, the request waits for the
//! snapshot replay and for any queued refresh, so it never races a
//! structural update.

use super::ModelService;
use crate::node::Node;
use filetree_core::{FileUri, NodeId};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Node to reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationTarget {
    /// A filesystem uri under the workspace root
    Uri(FileUri),
    /// A tree path such as `/workspace/src/lib.rs`
    Path(String),
}

impl From<FileUri> for LocationTarget {
    fn from(uri: FileUri) -> Self {
        Self::Uri(uri)
    }
}

impl From<&FileUri> for LocationTarget {
    fn from(uri: &FileUri) -> Self {
        Self::Uri(uri.clone())
    }
}

impl ModelService {
    /// Reveals, selects and scrolls to `target`.
    ///
    /// Returns the revealed node, or `None` if the target does not exist or
    /// a later request superseded this one.
    pub async fn location(&self, target: impl Into<LocationTarget>) -> Option<NodeId> {
        let (reply, response) = oneshot::channel();
        if let Some((superseded, previous)) = self.inner.location_slot.lock().replace((target.into(), reply)) {
            tracing::debug!(target = ?superseded, "location superseded");
            let _ = previous.send(None);
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner.location_delayer.trigger_if_idle(async move {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.flush_location().await;
            }
        });
        response.await.ok().flatten()
    }

    async fn flush_location(&self) {
        self.wait_for_snapshot().await;
        self.service().wait_for_refresh().await;

        let Some((target, reply)) = self.inner.location_slot.lock().take() else {
            return;
        };
        let revealed = match self.target_uri(&target) {
            Some(uri) => self.reveal(&uri, true).await,
            None => None,
        };
        if let Some(id) = revealed {
            self.select_file_decoration(id);
            self.tree().ensure_visible(id);
            tracing::debug!(target = ?target, node = %id, "located");
        } else {
            tracing::debug!(target = ?target, "location target not found");
        }
        let _ = reply.send(revealed);
    }

    fn target_uri(&self, target: &LocationTarget) -> Option<FileUri> {
        match target {
            LocationTarget::Uri(uri) => Some(uri.clone()),
            LocationTarget::Path(path) => self.tree().with_store(|store| {
                let root = store.root_node()?;
                if path == root.path() {
                    return Some(root.uri().clone());
                }
                let relative = path.strip_prefix(&format!("{}/", root.path()))?;
                Some(root.uri().join(relative))
            }),
        }
    }

    /// Finds the node for `uri`, resolving directories on the way.
    ///
    /// With `expand_ancestors` every directory on the way is expanded too.
    /// A uri inside a folded chain resolves to the folded node.
    pub(super) async fn reveal(&self, uri: &FileUri, expand_ancestors: bool) -> Option<NodeId> {
        let mut current = self.tree().root()?;
        loop {
            let node = self.node(current)?;
            if node.uri() == uri {
                return Some(current);
            }
            if !node.is_loaded() {
                self.service().load_children(current).await;
            }
            let next = self.tree().with_store(|store| {
                let parent = store.get(current)?;
                parent
                    .children()?
                    .iter()
                    .filter_map(|child| store.get(*child))
                    .find(|child| parent.uri().join(child.head_name()).is_equal_or_parent(uri))
                    .map(Node::id)
            })?;

            let child = self.node(next)?;
            if !child.is_directory() || child.uri() == uri || !child.uri().is_equal_or_parent(uri) {
                return Some(next);
            }
            if expand_ancestors {
                self.service().expand(next).await;
            }
            current = next;
        }
    }
}
