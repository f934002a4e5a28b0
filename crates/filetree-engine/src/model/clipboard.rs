//! Cut, copy and paste.

use super::naming::copy_name;
use super::{BatchOutcome, ModelService, OperationFailure};
use crate::decoration::TargetMode;
use crate::node::Node;
use filetree_core::{Error, FileOperation, FileUri, NodeId, Result};
use std::collections::HashSet;

/// What the paste buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasteType {
    /// Nothing to paste
    #[default]
    None,
    /// Paste copies the files and keeps the buffer
    Copy,
    /// Paste moves the files and empties the buffer
    Cut,
}

/// Single-slot clipboard. Each cut or copy replaces the previous content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteBuffer {
    /// Buffered nodes
    pub files: Vec<NodeId>,
    /// Buffer kind
    pub paste_type: PasteType,
}

impl ModelService {
    /// Puts `files` in the buffer for copying.
    pub fn copy_files(&self, files: &[NodeId]) {
        self.inner.decorations.cut.clear_targets();
        *self.inner.paste.lock() = PasteBuffer {
            files: files.to_vec(),
            paste_type: PasteType::Copy,
        };
    }

    /// Puts `files` in the buffer for moving and marks them as cut.
    pub fn cut_files(&self, files: &[NodeId]) {
        let cut = &self.inner.decorations.cut;
        cut.clear_targets();
        for id in files {
            cut.add_target(*id, TargetMode::Self_);
        }
        *self.inner.paste.lock() = PasteBuffer {
            files: files.to_vec(),
            paste_type: PasteType::Cut,
        };
    }

    /// Current buffer content.
    #[must_use]
    pub fn paste_buffer(&self) -> PasteBuffer {
        self.inner.paste.lock().clone()
    }

    /// Pastes the buffer into `target`, or into its parent if it is a file.
    ///
    /// Cut items already inside the target are skipped. After a cut paste
    /// the cut decoration is removed from every buffered item, including
    /// those that failed to move, and the buffer is emptied. Copies get a
    /// fresh name when the target already has an entry with theirs. The
    /// target is expanded afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the target is gone. Failures
    /// of individual items are reported in the outcome instead.
    pub async fn paste_files(&self, target: NodeId) -> Result<BatchOutcome> {
        let target = self.directory_of(target)?;
        let buffer = self.paste_buffer();
        let mut outcome = BatchOutcome::default();
        if buffer.paste_type == PasteType::None {
            return Ok(outcome);
        }
        if !target.is_loaded() {
            self.service().load_children(target.id()).await;
        }

        match buffer.paste_type {
            PasteType::None => {}
            PasteType::Cut => {
                for node in self.live_nodes(&buffer.files) {
                    if node.parent() == Some(target.id()) {
                        continue;
                    }
                    self.paste_move(&node, &target, &mut outcome).await;
                }
                self.inner.decorations.cut.clear_targets();
                *self.inner.paste.lock() = PasteBuffer::default();
            }
            PasteType::Copy => {
                let mut existing = self.child_names(target.id());
                for node in self.live_nodes(&buffer.files) {
                    let from = self.head_uri(&node);
                    let name = copy_name(node.head_name(), node.is_directory(), &existing);
                    let to = target.uri().join(&name);
                    match self.service().api().copy(&from, &to).await {
                        Ok(()) => {
                            existing.insert(name);
                            outcome.succeeded.push(to);
                        }
                        Err(e) => outcome.failures.push(OperationFailure::from_error(
                            FileOperation::Copy,
                            &from,
                            &e,
                        )),
                    }
                }
                self.service().refresh(Some(target.id()));
            }
        }

        self.service().expand(target.id()).await;
        for failure in &outcome.failures {
            self.report(failure);
        }
        Ok(outcome)
    }

    async fn paste_move(&self, node: &Node, target: &Node, outcome: &mut BatchOutcome) {
        let from = self.head_uri(node);
        let name = node.head_name().to_string();
        let to = target.uri().join(&name);
        let service = self.service();

        service.ignore_move(&from, &to);
        match service.api().mv(&from, &to).await {
            Ok(()) => {
                service.move_node(node.id(), target.id(), &name);
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

    pub(crate) fn directory_of(&self, id: NodeId) -> Result<Node> {
        let node = self.node(id).ok_or_else(|| Error::ResourceNotFound {
            resource: format!("node {id}"),
        })?;
        if node.is_directory() {
            return Ok(node);
        }
        node.parent()
            .and_then(|parent| self.node(parent))
            .ok_or_else(|| Error::ResourceNotFound {
                resource: format!("parent of {}", node.path()),
            })
    }

    pub(super) fn live_nodes(&self, ids: &[NodeId]) -> Vec<Node> {
        ids.iter().filter_map(|id| self.node(*id)).collect()
    }

    // A folded node is copied or moved from its outermost directory.
    pub(crate) fn head_uri(&self, node: &Node) -> FileUri {
        if node.is_compact() {
            self.service()
                .segment_uri(node.id(), 0)
                .unwrap_or_else(|| node.uri().clone())
        } else {
            node.uri().clone()
        }
    }

    fn child_names(&self, id: NodeId) -> HashSet<String> {
        self.tree().with_store(|store| {
            store
                .get(id)
                .and_then(Node::children)
                .unwrap_or_default()
                .iter()
                .filter_map(|child| store.get(*child))
                .map(|child| child.head_name().to_string())
                .collect()
        })
    }
}
