//! Node store: the arena of tree nodes and their stable identities.
//!
//! Nodes live in an id-keyed table; parents and children refer to each other
//! by [`NodeId`]. Every live node has a unique tree `path` built from the
//! names of its ancestors (`/<root>/<child>/...`). A compact node's name
//! contains `/`, so its path spells out the whole folded chain and matches
//! the real filesystem layout.
//!
//! The [`IdCache`] maps paths to the id last seen there and outlives
//! disposal, so a node re-created at the same path keeps its id.
//!
//! # Examples
//!
//! ```
//! use filetree_core::{FileStat, FileUri};
//! use filetree_engine::node::NodeStore;
//!
//! let mut store = NodeStore::new();
//! let root = store.create_root(FileStat::directory(FileUri::file("/w")), None);
//! let a = store.to_node(FileStat::file(FileUri::file("/w/a.txt")), root, None);
//! store.set_children(root, Some(vec![a]));
//!
//! assert_eq!(store.get(a).unwrap().path(), "/w/a.txt");
//!
//! // Disposing keeps the cached id, so the same path gets it back.
//! store.dispose(a);
//! let again = store.to_node(FileStat::file(FileUri::file("/w/a.txt")), root, None);
//! assert_eq!(again, a);
//! ```

use crate::sort::compare_entries;
use filetree_core::{FileStat, FileUri, NodeId};
use std::collections::HashMap;

/// Whether a node is a leaf or can hold children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Leaf entry
    File,
    /// Entry with lazily loaded children
    Directory,
}

/// A file or directory in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    name: String,
    display_name: Option<String>,
    uri: FileUri,
    filestat: FileStat,
    tooltip: String,
    parent: Option<NodeId>,
    children: Option<Vec<NodeId>>,
    expanded: bool,
    path: String,
}

impl Node {
    /// Stable id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// File or directory.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns `true` for directories.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Name relative to the parent. Contains `/` for compact nodes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown to the user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Uri of the entry. For compact nodes, the innermost directory.
    #[must_use]
    pub const fn uri(&self) -> &FileUri {
        &self.uri
    }

    /// Last known stat.
    #[must_use]
    pub const fn filestat(&self) -> &FileStat {
        &self.filestat
    }

    /// Readable location, `~`-relative when under the home directory.
    #[must_use]
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    /// Parent id, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Loaded children in display order, `None` until resolved.
    #[must_use]
    pub fn children(&self) -> Option<&[NodeId]> {
        self.children.as_deref()
    }

    /// Returns `true` once the children were resolved.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    /// Returns `true` if the directory is expanded.
    #[must_use]
    pub const fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Tree path, unique among live nodes.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if the node folds a chain of directories.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.name.contains('/')
    }

    /// First segment of the name.
    #[must_use]
    pub fn head_name(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }

    /// Name segments; a single element for regular nodes.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        self.name.split('/').collect()
    }
}

/// Path to id table retained across disposal.
#[derive(Debug, Default)]
pub struct IdCache {
    ids: HashMap<String, NodeId>,
}

impl IdCache {
    /// Id last assigned at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<NodeId> {
        self.ids.get(path).copied()
    }

    /// Records `id` at `path`.
    pub fn insert(&mut self, path: impl Into<String>, id: NodeId) {
        self.ids.insert(path.into(), id);
    }

    /// Moves the entry of `id` from `old` to `new`.
    pub fn rebind(&mut self, old: &str, new: &str, id: NodeId) {
        if self.ids.get(old) == Some(&id) {
            self.ids.remove(old);
        }
        self.ids.insert(new.to_string(), id);
    }

    /// Number of cached paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Outcome of re-deriving a node's compact chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompact {
    /// The name did not change
    Unchanged,
    /// The chain grew; a descendant was absorbed if it was loaded
    Folded,
    /// The chain shrank; the remainder became a synthetic child
    Unfolded(NodeId),
    /// The chain now leads elsewhere; previous children were dropped
    Replaced,
}

/// Joins a parent tree path and a child name.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Tooltip for `uri`: `~/<relative>` under `home`, else the plain path.
#[must_use]
pub fn tooltip_for(home: Option<&FileUri>, uri: &FileUri) -> String {
    match home.and_then(|home| home.relative(uri)) {
        Some(relative) if relative.is_empty() => "~".to_string(),
        Some(relative) => format!("~/{relative}"),
        None => uri.path().to_string(),
    }
}

/// Arena of live nodes with a path index and the id cache.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: HashMap<NodeId, Node>,
    paths: HashMap<String, NodeId>,
    cache: IdCache,
    next_id: u64,
    root: Option<NodeId>,
    home: Option<FileUri>,
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root id, if a root was created.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Root node, if a root was created.
    #[must_use]
    pub fn root_node(&self) -> Option<&Node> {
        self.root.and_then(|id| self.nodes.get(&id))
    }

    /// Node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node by tree path.
    #[must_use]
    pub fn get_by_path(&self, path: &str) -> Option<&Node> {
        self.paths.get(path).and_then(|id| self.nodes.get(id))
    }

    /// Id by tree path.
    #[must_use]
    pub fn id_by_path(&self, path: &str) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sets the home directory used for tooltips of new or moved nodes.
    pub fn set_home(&mut self, home: Option<FileUri>) {
        self.home = home;
    }

    /// The id cache.
    #[must_use]
    pub const fn id_cache(&self) -> &IdCache {
        &self.cache
    }

    /// Tree path of the node for `uri`.
    ///
    /// Returns `None` if the uri lies outside the root.
    #[must_use]
    pub fn path_for_uri(&self, uri: &FileUri) -> Option<String> {
        let root = self.root_node()?;
        let relative = root.uri.relative(uri)?;
        if relative.is_empty() {
            Some(root.path.clone())
        } else {
            Some(child_path(&root.path, &relative))
        }
    }

    /// Looks a node up by uri.
    ///
    /// In compact mode a uri that falls inside a folded chain resolves to
    /// the shallowest live node whose path contains the requested path.
    #[must_use]
    pub fn get_by_uri(&self, uri: &FileUri, compact: bool) -> Option<NodeId> {
        let path = self.path_for_uri(uri)?;
        if let Some(id) = self.id_by_path(&path) {
            return Some(id);
        }
        if !compact {
            return None;
        }
        let prefix = format!("{path}/");
        self.paths
            .iter()
            .filter(|(candidate, _)| candidate.starts_with(&prefix))
            .min_by_key(|(candidate, _)| (candidate.matches('/').count(), candidate.len()))
            .map(|(_, id)| *id)
    }

    /// Ancestors of `id`, nearest first, ending at the root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(&id).and_then(|node| node.parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes.get(&parent).and_then(|node| node.parent);
        }
        chain
    }

    /// Depth below the root; the root has depth 0.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Ids of every live node, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    fn allocate_id(&mut self, path: &str) -> NodeId {
        let id = match self.cache.get(path) {
            Some(cached) if !self.nodes.contains_key(&cached) => cached,
            _ => {
                self.next_id += 1;
                NodeId::new(self.next_id)
            }
        };
        self.cache.insert(path, id);
        id
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id;
        if let Some(previous) = self.paths.get(&node.path).copied()
            && previous != id
        {
            tracing::debug!(path = %node.path, "replacing live node at path");
            self.dispose(previous);
        }
        self.paths.insert(node.path.clone(), id);
        self.nodes.insert(id, node);
        id
    }

    /// Creates the root, disposing a previous root and its subtree.
    pub fn create_root(&mut self, stat: FileStat, display_name: Option<String>) -> NodeId {
        if let Some(previous) = self.root.take() {
            self.dispose(previous);
        }
        let name = stat.uri.name().to_string();
        let path = format!("/{name}");
        let id = self.allocate_id(&path);
        let tooltip = tooltip_for(self.home.as_ref(), &stat.uri);
        self.insert(Node {
            id,
            kind: NodeKind::Directory,
            name,
            display_name,
            uri: stat.uri.clone(),
            filestat: stat,
            tooltip,
            parent: None,
            children: None,
            expanded: true,
            path,
        });
        self.root = Some(id);
        id
    }

    /// Builds a node for `stat` under `parent`.
    ///
    /// The node is not attached to the parent's children; see
    /// [`set_children`](Self::set_children). `name` defaults to the last
    /// segment of the uri. The id comes from the id cache when the path was
    /// seen before.
    pub fn to_node(&mut self, stat: FileStat, parent: NodeId, name: Option<String>) -> NodeId {
        let name = name.unwrap_or_else(|| stat.uri.name().to_string());
        let parent_path = self
            .nodes
            .get(&parent)
            .map_or_else(|| "/".to_string(), |node| node.path.clone());
        let path = child_path(&parent_path, &name);
        let id = self.allocate_id(&path);
        let kind = if stat.is_directory {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let tooltip = tooltip_for(self.home.as_ref(), &stat.uri);
        self.insert(Node {
            id,
            kind,
            name,
            display_name: None,
            uri: stat.uri.clone(),
            filestat: stat,
            tooltip,
            parent: Some(parent),
            children: None,
            expanded: false,
            path,
        })
    }

    /// Replaces the children list of a directory.
    ///
    /// Children are re-parented to `parent` and sorted for display.
    pub fn set_children(&mut self, parent: NodeId, children: Option<Vec<NodeId>>) {
        if let Some(ids) = &children {
            for child in ids {
                if let Some(node) = self.nodes.get_mut(child) {
                    node.parent = Some(parent);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children = children;
        }
        self.sort_children(parent);
    }

    /// Re-sorts the children of a directory.
    pub fn sort_children(&mut self, parent: NodeId) {
        let Some(mut children) = self.nodes.get_mut(&parent).and_then(|node| node.children.take())
        else {
            return;
        };
        children.sort_by(|a, b| match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(a), Some(b)) => {
                compare_entries(a.is_directory(), &a.name, b.is_directory(), &b.name)
            }
            _ => a.cmp(b),
        });
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children = Some(children);
        }
    }

    /// Inserts `child` into the loaded children of `parent`, keeping order.
    ///
    /// Returns `false` if the parent's children are not loaded.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let Some(children) = node.children.as_mut() else {
            return false;
        };
        if !children.contains(&child) {
            children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        self.sort_children(parent);
        true
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get(&id).and_then(|node| node.parent);
        if let Some(children) = parent
            .and_then(|parent| self.nodes.get_mut(&parent))
            .and_then(|node| node.children.as_mut())
        {
            children.retain(|child| *child != id);
        }
    }

    /// Removes a node and its loaded subtree.
    ///
    /// Id cache entries are kept.
    pub fn dispose(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if self.paths.get(&node.path) == Some(&current) {
                    self.paths.remove(&node.path);
                }
                stack.extend(node.children.unwrap_or_default());
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    /// Sets the expanded flag. The root always stays expanded.
    ///
    /// Returns `true` if the flag changed.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        if Some(id) == self.root {
            return false;
        }
        match self.nodes.get_mut(&id) {
            Some(node) if node.is_directory() && node.expanded != expanded => {
                node.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    /// Replaces the stat of a node, keeping its uri.
    pub fn update_stat(&mut self, id: NodeId, stat: FileStat) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.filestat = stat;
        }
    }

    /// Renames a node and rewrites the path of its loaded subtree.
    pub fn rekey(&mut self, id: NodeId, name: &str, uri: FileUri) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old_uri = node.uri.clone();
        node.name = name.to_string();
        node.tooltip = tooltip_for(self.home.as_ref(), &uri);
        node.filestat.uri = uri.clone();
        node.uri = uri.clone();
        self.refresh_paths(id, Some((&old_uri, &uri)));
    }

    /// Moves a node under `parent` with a new name and uri.
    ///
    /// Returns `true` if it was attached to the parent's loaded children.
    pub fn reparent(&mut self, id: NodeId, parent: NodeId, name: &str, uri: FileUri) -> bool {
        self.detach(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
        self.rekey(id, name, uri);
        self.attach(parent, id)
    }

    // Recomputes paths below `id` and, when the uri moved, the uris too.
    fn refresh_paths(&mut self, id: NodeId, moved: Option<(&FileUri, &FileUri)>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let parent_path = self
                .nodes
                .get(&current)
                .and_then(|node| node.parent)
                .and_then(|parent| self.nodes.get(&parent))
                .map(|node| node.path.clone());
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };

            let new_path = match parent_path {
                Some(parent_path) => child_path(&parent_path, &node.name),
                None => format!("/{}", node.name),
            };
            if current != id
                && let Some((from, to)) = moved
                && let Some(relative) = from.relative(&node.uri)
            {
                let uri = to.join(&relative);
                node.filestat.uri = uri.clone();
                node.tooltip = tooltip_for(self.home.as_ref(), &uri);
                node.uri = uri;
            }
            let old_path = std::mem::replace(&mut node.path, new_path.clone());
            stack.extend(node.children.iter().flatten().copied());

            if old_path != new_path {
                if self.paths.get(&old_path) == Some(&current) {
                    self.paths.remove(&old_path);
                }
                self.paths.insert(new_path.clone(), current);
                self.cache.rebind(&old_path, &new_path, current);
            }
        }
    }

    /// Re-derives the compact chain of a directory.
    ///
    /// `name` is the new chain relative to the parent and `stat` the stat of
    /// the innermost directory. Growing the chain absorbs the loaded
    /// descendant at the new path, so its children keep their ids; shrinking
    /// it moves the previous children under a synthetic node for the rest
    /// of the chain.
    pub fn recompact(&mut self, id: NodeId, name: &str, stat: FileStat) -> Recompact {
        let Some(node) = self.nodes.get(&id) else {
            return Recompact::Unchanged;
        };
        let old_name = node.name.clone();
        if old_name == name {
            self.update_stat(id, stat);
            return Recompact::Unchanged;
        }
        let parent_path = node
            .parent
            .and_then(|parent| self.nodes.get(&parent))
            .map_or_else(|| "/".to_string(), |parent| parent.path.clone());
        let new_path = child_path(&parent_path, name);
        let old_uri = node.uri.clone();
        let expanded = node.expanded;

        if name.starts_with(&format!("{old_name}/")) {
            let absorbed = self
                .id_by_path(&new_path)
                .filter(|candidate| self.is_ancestor(id, *candidate));
            let inherited = absorbed.and_then(|absorbed| {
                self.nodes
                    .get_mut(&absorbed)
                    .and_then(|node| node.children.take())
            });
            self.drop_children(id);
            self.rekey(id, name, stat.uri.clone());
            self.update_stat(id, stat);
            self.set_children(id, inherited);
            self.refresh_paths(id, None);
            return Recompact::Folded;
        }

        if let Some(remainder) = old_name.strip_prefix(&format!("{name}/")) {
            let previous = self.nodes.get_mut(&id).and_then(|node| node.children.take());
            self.rekey(id, name, stat.uri.clone());
            self.update_stat(id, stat);

            let synthetic = self.to_node(
                FileStat::directory(old_uri),
                id,
                Some(remainder.to_string()),
            );
            if let Some(node) = self.nodes.get_mut(&synthetic) {
                node.expanded = expanded;
            }
            self.set_children(synthetic, previous);
            self.set_children(id, Some(vec![synthetic]));
            return Recompact::Unfolded(synthetic);
        }

        self.drop_children(id);
        self.rekey(id, name, stat.uri.clone());
        self.update_stat(id, stat);
        Recompact::Replaced
    }

    fn drop_children(&mut self, id: NodeId) {
        let children = self
            .nodes
            .get_mut(&id)
            .and_then(|node| node.children.take())
            .unwrap_or_default();
        for child in children {
            self.dispose(child);
        }
    }
}
