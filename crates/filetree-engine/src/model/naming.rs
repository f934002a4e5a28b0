//! Name validation for rename and create prompts, and copy naming.

use super::ModelService;
use crate::node::{Node, child_path};
use filetree_core::{NameWarning, NodeId, ValidationError};
use std::collections::HashSet;

const MAX_NAME_BYTES: usize = 255;
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// What a name prompt is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePrompt {
    /// Renaming an existing node
    Rename(NodeId),
    /// Renaming one segment of a folded node's name
    RenameSegment {
        /// Folded node
        id: NodeId,
        /// Segment being renamed, 0 for the outermost
        index: usize,
    },
    /// Creating a new entry inside a directory
    Create {
        /// Directory receiving the entry
        parent: NodeId,
    },
}

/// Returns `true` if `segment` is usable as a single file name.
///
/// # Examples
///
/// ```
/// use filetree_engine::model::is_valid_basename;
///
/// assert!(is_valid_basename("main.rs"));
/// assert!(!is_valid_basename(".."));
/// assert!(!is_valid_basename("a:b"));
/// assert!(!is_valid_basename("   "));
/// ```
#[must_use]
pub fn is_valid_basename(segment: &str) -> bool {
    !segment.trim().is_empty()
        && segment != "."
        && segment != ".."
        && segment.len() <= MAX_NAME_BYTES
        && !segment
            .chars()
            .any(|c| RESERVED.contains(&c) || c.is_control())
}

/// Picks a name for a copy of `name` that does not collide with `existing`.
///
/// Files keep their extension: `a.txt` becomes `a copy.txt`, then
/// `a copy 2.txt`.
///
/// # Examples
///
/// ```
/// use filetree_engine::model::copy_name;
/// use std::collections::HashSet;
///
/// let existing: HashSet<String> = ["a.txt", "a copy.txt"].map(String::from).into();
/// assert_eq!(copy_name("a.txt", false, &existing), "a copy 2.txt");
/// assert_eq!(copy_name("b.txt", false, &existing), "b.txt");
/// ```
#[must_use]
pub fn copy_name(name: &str, is_directory: bool, existing: &HashSet<String>) -> String {
    if !existing.contains(name) {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && !is_directory => name.split_at(dot),
        _ => (name, ""),
    };
    let mut candidate = format!("{stem} copy{extension}");
    let mut counter = 2;
    while existing.contains(&candidate) {
        candidate = format!("{stem} copy {counter}{extension}");
        counter += 1;
    }
    candidate
}

impl ModelService {
    /// Validates a name typed into a rename or create prompt.
    ///
    /// Returns a non-blocking warning for names with leading or trailing
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the name is empty, starts with a
    /// separator, collides with an existing sibling, or contains an invalid
    /// segment.
    pub fn validate_file_name(
        &self,
        prompt: &NamePrompt,
        name: &str,
    ) -> std::result::Result<Option<NameWarning>, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        if name.starts_with(['/', '\\']) {
            return Err(ValidationError::LeadingSeparator);
        }

        let segment = match *prompt {
            NamePrompt::RenameSegment { id, index } => Some((id, index)),
            NamePrompt::Rename(id) => self
                .node(id)
                .filter(Node::is_compact)
                .map(|node| (id, node.segments().len() - 1)),
            NamePrompt::Create { .. } => None,
        };
        let collides = match segment {
            Some((id, index)) => self.segment_collides(id, index, name),
            None => self.tree().with_store(|store| {
                let (parent, current) = match *prompt {
                    NamePrompt::Rename(id) => {
                        let node = store.get(id)?;
                        (node.parent()?, Some(node.name()))
                    }
                    NamePrompt::Create { parent } => (parent, None),
                    NamePrompt::RenameSegment { .. } => return None,
                };
                if current == Some(name) {
                    return None;
                }
                let parent = store.get(parent)?;
                let target = child_path(parent.path(), name);
                Some(store.get_by_path(&target).is_some())
            }),
        };
        if collides == Some(true) {
            return Err(ValidationError::AlreadyExists {
                name: name.to_string(),
            });
        }

        if let Some(segment) = name.split(['/', '\\']).find(|s| !is_valid_basename(s)) {
            return Err(ValidationError::InvalidSegment {
                segment: segment.to_string(),
            });
        }

        if name.trim() != name {
            return Ok(Some(NameWarning::LeadingOrTrailingWhitespace));
        }
        Ok(None)
    }

    // A folded node may keep its own segment; any other node living where
    // the renamed segment would land is a collision.
    fn segment_collides(&self, id: NodeId, index: usize, name: &str) -> Option<bool> {
        let node = self.node(id)?;
        if node.segments().get(index).copied() == Some(name) {
            return None;
        }
        let target = self.service().segment_uri(id, index)?.parent()?.join(name);
        Some(
            self.service()
                .get_node_by_uri(&target)
                .is_some_and(|other| other != id),
        )
    }
}
