//! Rename and create.

use super::naming::NamePrompt;
use super::{ModelService, OperationFailure};
use crate::decoration::TargetMode;
use crate::node::NodeKind;
use filetree_core::{Error, FileOperation, FileUri, NodeId, Result};

impl ModelService {
    /// Renames a node.
    ///
    /// Renaming to the current name does nothing. A folded node renames its
    /// innermost segment; see [`rename_segment`](Self::rename_segment).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is rejected, or
    /// [`Error::OperationFailed`] if the move failed.
    pub async fn rename(&self, id: NodeId, new_name: &str) -> Result<()> {
        let node = self.node(id).ok_or_else(|| Error::ResourceNotFound {
            resource: format!("node {id}"),
        })?;
        if node.name() == new_name {
            tracing::debug!(path = %node.path(), "rename to the same name skipped");
            return Ok(());
        }
        if node.is_compact() {
            let last = node.segments().len() - 1;
            return self.rename_segment(id, last, new_name).await;
        }

        self.validate_file_name(&NamePrompt::Rename(id), new_name)?;
        let parent = node.parent().ok_or_else(|| Error::ResourceNotFound {
            resource: format!("parent of {}", node.path()),
        })?;
        let parent_uri = node.uri().parent().ok_or_else(|| Error::ResourceNotFound {
            resource: format!("parent of {}", node.uri()),
        })?;
        let from = node.uri().clone();
        let to = parent_uri.join(new_name);

        self.commit_move(id, &from, &to).await?;
        if !self.is_same_node(id, node.path()) {
            return Ok(());
        }
        if new_name.contains(['/', '\\']) {
            self.service().refresh(Some(parent));
        } else {
            self.service().move_node(id, parent, new_name);
        }
        Ok(())
    }

    /// Renames one segment of a folded node's name.
    ///
    /// For a node `a/b/c`, renaming segment 1 to `x` moves the directory
    /// `a/b` to `a/x`; the node becomes `a/x/c`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the segment is rejected, or
    /// [`Error::OperationFailed`] if the move failed.
    pub async fn rename_segment(&self, id: NodeId, index: usize, segment: &str) -> Result<()> {
        let node = self.node(id).ok_or_else(|| Error::ResourceNotFound {
            resource: format!("node {id}"),
        })?;
        let mut segments: Vec<String> = node.segments().into_iter().map(str::to_string).collect();
        let Some(current) = segments.get(index) else {
            return Err(Error::ResourceNotFound {
                resource: format!("segment {index} of {}", node.path()),
            });
        };
        if current == segment {
            return Ok(());
        }
        self.validate_file_name(&NamePrompt::RenameSegment { id, index }, segment)?;
        if segment.contains(['/', '\\']) {
            return Err(filetree_core::ValidationError::InvalidSegment {
                segment: segment.to_string(),
            }
            .into());
        }

        let parent = node.parent().ok_or_else(|| Error::ResourceNotFound {
            resource: format!("parent of {}", node.path()),
        })?;
        let from = self
            .service()
            .segment_uri(id, index)
            .ok_or_else(|| Error::ResourceNotFound {
                resource: format!("segment {index} of {}", node.path()),
            })?;
        let to = from
            .parent()
            .map_or_else(|| FileUri::file(segment), |parent| parent.join(segment));

        self.commit_move(id, &from, &to).await?;
        if !self.is_same_node(id, node.path()) {
            return Ok(());
        }
        segments[index] = segment.to_string();
        self.service().move_node(id, parent, &segments.join("/"));
        Ok(())
    }

    // Issues `mv` with the loading decoration and event suppression in place.
    async fn commit_move(&self, id: NodeId, from: &FileUri, to: &FileUri) -> Result<()> {
        let service = self.service();
        let loading = &self.inner.decorations.loading;
        service.ignore_move(from, to);
        loading.add_target(id, TargetMode::Self_);
        let result = service.api().mv(from, to).await;
        loading.remove_target(id);

        if let Err(e) = result {
            service.unignore(&[from.clone(), to.clone()]);
            self.report(&OperationFailure::from_error(FileOperation::Move, from, &e));
            return Err(e);
        }
        tracing::debug!(from = %from, to = %to, "moved");
        Ok(())
    }

    fn is_same_node(&self, id: NodeId, path: &str) -> bool {
        let same = self
            .tree()
            .with_store(|store| store.get(id).is_some_and(|node| node.path() == path));
        if !same {
            tracing::debug!(path, "node changed while the operation was in flight");
        }
        same
    }

    /// Creates a file or directory named `name` inside `parent`.
    ///
    /// `name` may contain separators to create intermediate directories.
    /// Returns the node shown for the new entry.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is rejected, or
    /// [`Error::OperationFailed`] if the filesystem call failed.
    pub async fn create(&self, parent: NodeId, name: &str, kind: NodeKind) -> Result<Option<NodeId>> {
        let directory = self.node(parent).ok_or_else(|| Error::ResourceNotFound {
            resource: format!("node {parent}"),
        })?;
        let parent = if directory.is_directory() {
            directory.id()
        } else {
            directory.parent().ok_or_else(|| Error::ResourceNotFound {
                resource: format!("parent of {}", directory.path()),
            })?
        };
        let parent_uri = self
            .node(parent)
            .map(|node| node.uri().clone())
            .ok_or_else(|| Error::ResourceNotFound {
                resource: format!("node {parent}"),
            })?;

        if let Some(warning) = self.validate_file_name(&NamePrompt::Create { parent }, name)? {
            tracing::debug!(name, %warning, "creating with a warning");
        }

        let uri = parent_uri.join(name);
        let service = self.service();
        let ignored = service.ignore_create(&parent_uri, name);
        let loading = &self.inner.decorations.loading;
        loading.add_target(parent, TargetMode::Self_);
        let (operation, result) = match kind {
            NodeKind::Directory => (
                FileOperation::CreateDirectory,
                service.api().create_directory(&uri).await,
            ),
            NodeKind::File => (FileOperation::CreateFile, service.api().create_file(&uri).await),
        };
        loading.remove_target(parent);

        if let Err(e) = result {
            service.unignore(&ignored);
            self.report(&OperationFailure::from_error(operation, &uri, &e));
            return Err(e);
        }
        tracing::debug!(uri = %uri, "created");
        Ok(service.add_node(parent, name, kind).await)
    }
}
