//! Lazy child resolution, watch-event reconciliation and refresh.
//!
//! The [`FileTreeService`] fills the [`TreeModel`] from a [`FileTreeApi`].
//! Directories are resolved on first expansion. Filesystem change batches are
//! mapped to the nearest loaded directory and patched locally; refresh
//! requests are queued, reduced to their topmost paths and flushed in series
//! after a short delay.
//!
//! Resolution failures never leave the service: the directory shows no
//! children and the error is logged.

use crate::node::{Node, NodeKind, NodeStore, Recompact};
use crate::scheduler::Delayer;
use crate::tree_model::TreeModel;
use filetree_core::traits::FileTreeApi;
use filetree_core::{FileChange, FileChangeType, FileStat, FileUri, NodeId, ResolvedChildren, TreeConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct IgnoreState {
    events: HashMap<FileUri, FileChangeType>,
    once: Option<FileUri>,
}

impl IgnoreState {
    fn filter(&mut self, changes: Vec<FileChange>) -> Vec<FileChange> {
        let mut changes = changes;
        if let Some(once) = self.once.clone() {
            let before = changes.len();
            let events = &mut self.events;
            changes.retain(|change| {
                if !once.is_equal_or_parent(&change.uri) {
                    return true;
                }
                if events.get(&change.uri) == Some(&change.change_type) {
                    events.remove(&change.uri);
                }
                false
            });
            if changes.len() != before {
                self.once = None;
            }
        }
        changes.retain(|change| {
            if self.events.get(&change.uri) == Some(&change.change_type) {
                self.events.remove(&change.uri);
                tracing::debug!(uri = %change.uri, kind = ?change.change_type, "ignoring self-caused event");
                return false;
            }
            true
        });
        changes
    }
}

struct ServiceInner {
    api: Arc<dyn FileTreeApi>,
    tree: TreeModel,
    compact: AtomicBool,
    ignore: Mutex<IgnoreState>,
    queue: Mutex<Vec<String>>,
    refresh_delayer: Delayer,
    flush_lock: tokio::sync::Mutex<()>,
    busy: watch::Sender<bool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
    }
}

/// Keeps the tree in sync with the filesystem.
///
/// Cloning yields another handle to the same service.
///
/// # Examples
///
/// ```no_run
/// use filetree_core::{FileUri, TreeConfig};
/// use filetree_core::traits::FileTreeApi;
/// use filetree_engine::FileTreeService;
/// use std::sync::Arc;
///
/// async fn open(api: Arc<dyn FileTreeApi>) {
///     let service = FileTreeService::new(api, &TreeConfig::default());
///     let root = service.init(&FileUri::file("/workspace"), None).await;
///     service.start_watching();
///
///     for id in service.tree().visible_nodes() {
///         let node = service.tree().node(id).unwrap();
///         println!("{}", node.display_name());
///     }
///     # let _ = root;
/// }
/// ```
#[derive(Clone)]
pub struct FileTreeService {
    inner: Arc<ServiceInner>,
}

impl FileTreeService {
    /// Creates a service over `api`.
    #[must_use]
    pub fn new(api: Arc<dyn FileTreeApi>, config: &TreeConfig) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(ServiceInner {
                api,
                tree: TreeModel::new(config),
                compact: AtomicBool::new(config.compact_folders),
                ignore: Mutex::new(IgnoreState::default()),
                queue: Mutex::new(Vec::new()),
                refresh_delayer: Delayer::new(config.refresh_flush_delay()),
                flush_lock: tokio::sync::Mutex::new(()),
                busy,
                watcher: Mutex::new(None),
            }),
        }
    }

    /// The tree this service maintains.
    #[must_use]
    pub fn tree(&self) -> &TreeModel {
        &self.inner.tree
    }

    /// The filesystem collaborator.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn FileTreeApi> {
        &self.inner.api
    }

    /// Returns `true` if single-child directory chains are folded.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.inner.compact.load(Ordering::SeqCst)
    }

    /// Creates the root for `root_uri` and resolves its children.
    ///
    /// Replaces any previous root.
    pub async fn init(&self, root_uri: &FileUri, display_name: Option<String>) -> NodeId {
        let stat = match self.inner.api.get_file_stat(root_uri).await {
            Ok(Some(stat)) => stat,
            Ok(None) => {
                tracing::warn!(uri = %root_uri, "workspace root does not exist");
                FileStat::directory(root_uri.clone())
            }
            Err(e) => {
                tracing::error!(uri = %root_uri, error = %e, "failed to stat workspace root");
                FileStat::directory(root_uri.clone())
            }
        };
        let home = self.inner.api.user_home();
        let root = self.inner.tree.update(|store| {
            store.set_home(home);
            store.create_root(stat, display_name)
        });
        self.inner.ignore.lock().events.clear();
        tracing::info!(uri = %root_uri, "file tree initialised");

        self.load_children(root).await;
        self.inner.tree.dispatch_change();
        root
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.tree.node(id)
    }

    /// Node by tree path.
    #[must_use]
    pub fn get_node_by_path(&self, path: &str) -> Option<NodeId> {
        self.inner.tree.with_store(|store| store.id_by_path(path))
    }

    /// Node by uri, with the compact fallback when folding is on.
    #[must_use]
    pub fn get_node_by_uri(&self, uri: &FileUri) -> Option<NodeId> {
        let compact = self.is_compact();
        self.inner.tree.with_store(|store| store.get_by_uri(uri, compact))
    }

    /// Uri of segment `index` of a node's name.
    ///
    /// For a folded node `a/b/c` under `/w`, segment 0 is `/w/a` and segment
    /// 2 is `/w/a/b/c`.
    #[must_use]
    pub fn segment_uri(&self, id: NodeId, index: usize) -> Option<FileUri> {
        self.inner.tree.with_store(|store| {
            let node = store.get(id)?;
            let segments = node.segments();
            if index >= segments.len() {
                return None;
            }
            let base = node
                .parent()
                .and_then(|parent| store.get(parent))
                .map_or_else(|| node.uri().clone(), |parent| parent.uri().clone());
            if node.parent().is_none() {
                return Some(base);
            }
            Some(base.join(&segments[..=index].join("/")))
        })
    }

    /// Resolves a directory if needed, then expands it.
    ///
    /// Returns `false` if `id` is not a live directory.
    pub async fn expand(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if !node.is_directory() {
            return false;
        }
        if !node.is_loaded() {
            self.load_children(id).await;
        }
        self.inner.tree.set_expanded(id, true);
        self.inner.tree.with_store(|store| store.contains(id))
    }

    /// Collapses a directory.
    pub fn collapse(&self, id: NodeId) -> bool {
        self.inner.tree.set_expanded(id, false)
    }

    /// Resolves the children of one directory and reconciles them.
    ///
    /// Returns the child directories that should be reconciled next: those
    /// already loaded and those showing a folded chain.
    pub async fn load_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(target) = self.resolve_target(id) else {
            return Vec::new();
        };

        let mut resolved = self.resolve_logged(&target.head_uri).await;
        let mut chain = vec![target.head_name.clone()];
        let mut last_stat = resolved
            .filestat
            .clone()
            .unwrap_or_else(|| FileStat::directory(target.head_uri.clone()));

        if target.foldable && self.is_compact() {
            while let [only] = resolved.children.as_slice()
                && only.is_directory
                && !only.is_symbolic_link
            {
                let next = only.clone();
                chain.push(next.uri.name().to_string());
                resolved = self.resolve_logged(&next.uri).await;
                last_stat = next;
            }
        }

        let outcome = self.inner.tree.update(|store| {
            match store.get(id) {
                Some(node) if node.path() == target.path => {}
                _ => {
                    tracing::debug!(path = %target.path, "discarding stale resolution");
                    return None;
                }
            }
            let mut changed = false;
            if target.foldable {
                let name = chain.join("/");
                changed |= store.recompact(id, &name, last_stat) != Recompact::Unchanged;
            } else if let Some(stat) = resolved.filestat.take() {
                store.update_stat(id, stat);
            }
            changed |= reconcile_children(store, id, resolved.children);
            Some(changed)
        });

        let Some(changed) = outcome else {
            return Vec::new();
        };
        if changed {
            self.inner.tree.dispatch_change();
        }

        self.inner.tree.with_store(|store| {
            store
                .get(id)
                .and_then(Node::children)
                .unwrap_or_default()
                .iter()
                .filter_map(|child| store.get(*child))
                .filter(|child| child.is_directory() && (child.is_loaded() || child.is_compact()))
                .map(Node::id)
                .collect()
        })
    }

    fn resolve_target(&self, id: NodeId) -> Option<ResolveTarget> {
        self.inner.tree.with_store(|store| {
            let node = store.get(id)?;
            if !node.is_directory() {
                return None;
            }
            let parent_uri = node
                .parent()
                .and_then(|parent| store.get(parent))
                .map(|parent| parent.uri().clone());
            let head_uri = match &parent_uri {
                Some(parent_uri) if node.is_compact() => parent_uri.join(node.head_name()),
                _ => node.uri().clone(),
            };
            Some(ResolveTarget {
                path: node.path().to_string(),
                head_name: node.head_name().to_string(),
                head_uri,
                foldable: parent_uri.is_some() && !node.filestat().is_symbolic_link,
            })
        })
    }

    async fn resolve_logged(&self, uri: &FileUri) -> ResolvedChildren {
        match self.inner.api.resolve_children(uri).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "failed to resolve children");
                ResolvedChildren::default()
            }
        }
    }

    /// Re-resolves a directory and every loaded directory below it.
    pub async fn reconcile(&self, id: NodeId) {
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            queue.extend(self.load_children(current).await);
        }
    }

    /// Queues a refresh of `id`, or of the root when `None`.
    ///
    /// Files refresh their parent. Refreshing the root also forgets pending
    /// ignore registrations.
    pub fn refresh(&self, id: Option<NodeId>) {
        let target = self.inner.tree.with_store(|store| {
            let id = id.or_else(|| store.root())?;
            let node = store.get(id)?;
            let directory = if node.is_directory() {
                node
            } else {
                store.get(node.parent()?)?
            };
            Some((directory.path().to_string(), directory.parent().is_none()))
        });
        let Some((path, is_root)) = target else {
            return;
        };
        if is_root {
            self.inner.ignore.lock().events.clear();
        }
        self.queue_refresh(path);
    }

    fn queue_refresh(&self, path: String) {
        {
            let mut queue = self.inner.queue.lock();
            if !queue.contains(&path) {
                tracing::debug!(path = %path, "queueing refresh");
                queue.push(path);
            }
        }
        self.inner.busy.send_replace(true);

        let weak = Arc::downgrade(&self.inner);
        self.inner.refresh_delayer.trigger_if_idle(async move {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.flush_refresh().await;
            }
        });
    }

    async fn flush_refresh(&self) {
        let _guard = self.inner.flush_lock.lock().await;
        let paths = topmost_paths(std::mem::take(&mut *self.inner.queue.lock()));
        for path in paths {
            let Some(id) = self.get_node_by_path(&path) else {
                tracing::debug!(path = %path, "refresh target disappeared");
                continue;
            };
            self.reconcile(id).await;
        }

        // Directories that changed already requested their render.
        let more = !self.inner.queue.lock().is_empty() || self.inner.refresh_delayer.is_pending();
        self.inner.busy.send_replace(more);
    }

    /// Returns `true` while a refresh is queued or running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        *self.inner.busy.borrow()
    }

    /// Waits until no refresh is queued or running.
    pub async fn wait_for_refresh(&self) {
        let mut busy = self.inner.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    /// Starts applying filesystem change batches.
    ///
    /// Calling it again has no effect.
    pub fn start_watching(&self) {
        let mut watcher = self.inner.watcher.lock();
        if watcher.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("cannot watch outside a tokio runtime");
            return;
        };

        let mut events = self.inner.api.subscribe();
        let weak: Weak<ServiceInner> = Arc::downgrade(&self.inner);
        *watcher = Some(runtime.spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let service = Self { inner };
                match received {
                    Ok(batch) => service.apply_changes(batch),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "file events lagged, refreshing the whole tree");
                        service.refresh(None);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
        tracing::debug!("watching file changes");
    }

    /// Returns `true` once [`start_watching`](Self::start_watching) ran.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.inner.watcher.lock().is_some()
    }

    /// Applies one batch of filesystem changes.
    ///
    /// Self-caused events are dropped first. Content updates of files are
    /// ignored. Deletions remove the node at once and cancel queued
    /// refreshes beneath it; everything else refreshes the nearest loaded
    /// parent directory.
    pub fn apply_changes(&self, changes: Vec<FileChange>) {
        let changes = self.inner.ignore.lock().filter(changes);
        if changes.is_empty() {
            return;
        }
        let compact = self.is_compact();

        for change in changes {
            let node = self.get_node_by_uri(&change.uri).and_then(|id| self.node(id));
            match change.change_type {
                FileChangeType::Updated if node.as_ref().is_some_and(|n| !n.is_directory()) => {
                    tracing::trace!(uri = %change.uri, "ignoring content change");
                }
                FileChangeType::Deleted => {
                    let exact = node.filter(|n| n.uri() == &change.uri && n.parent().is_some());
                    if let Some(node) = exact {
                        self.remove(&node);
                        if compact && let Some(parent) = node.parent() {
                            self.refresh(Some(parent));
                        }
                    } else if let Some(parent) = self.nearest_loaded_parent(&change.uri) {
                        self.queue_refresh(parent);
                    }
                }
                _ => {
                    if let Some(parent) = self.nearest_loaded_parent(&change.uri) {
                        self.queue_refresh(parent);
                    }
                }
            }
        }
    }

    fn remove(&self, node: &Node) {
        let path = node.path().to_string();
        let prefix = format!("{path}/");
        self.inner
            .queue
            .lock()
            .retain(|queued| *queued != path && !queued.starts_with(&prefix));
        self.inner.tree.update(|store| store.dispose(node.id()));
        self.inner.tree.dispatch_change();
        tracing::debug!(path = %path, "node removed");
    }

    // Tree path of the nearest loaded directory containing `uri`.
    fn nearest_loaded_parent(&self, uri: &FileUri) -> Option<String> {
        let compact = self.is_compact();
        self.inner.tree.with_store(|store| {
            let mut cursor = uri.parent();
            while let Some(candidate) = cursor {
                if let Some(node) = store.get_by_uri(&candidate, compact).and_then(|id| store.get(id))
                    && node.is_directory()
                {
                    return node.is_loaded().then(|| node.path().to_string());
                }
                let root = store.root_node()?;
                if !root.uri().is_equal_or_parent(&candidate) {
                    return None;
                }
                cursor = candidate.parent();
            }
            None
        })
    }

    /// Registers a self-caused event to drop once.
    pub fn ignore_file_event(&self, uri: FileUri, change_type: FileChangeType) {
        self.inner.ignore.lock().events.insert(uri, change_type);
    }

    /// Drops every event at or under `uri` in the next batch that has one.
    pub fn ignore_file_event_once(&self, uri: Option<FileUri>) {
        self.inner.ignore.lock().once = uri;
    }

    /// Switches compact folding and refreshes the whole tree.
    pub fn set_compact_mode(&self, compact: bool) {
        if self.inner.compact.swap(compact, Ordering::SeqCst) != compact {
            tracing::info!(compact, "compact folders changed");
            self.refresh(None);
        }
    }

    /// Registers the events a move from `from` to `to` will cause.
    ///
    /// Call before issuing the filesystem call so the watcher cannot see the
    /// events first. Moving a directory also drops the events of its
    /// entries arriving under `to` in the next batch.
    pub fn ignore_move(&self, from: &FileUri, to: &FileUri) {
        if from == to {
            return;
        }
        let moves_directory = self
            .get_node_by_uri(from)
            .and_then(|id| self.node(id))
            .is_some_and(|node| node.is_directory());
        let mut ignore = self.inner.ignore.lock();
        ignore.events.insert(from.clone(), FileChangeType::Deleted);
        ignore.events.insert(to.clone(), FileChangeType::Added);
        if moves_directory {
            ignore.once = Some(to.clone());
        }
    }

    /// Registers the events creating `name` under `parent_uri` will cause.
    ///
    /// Every segment of a multi-segment name produces its own `Added` event.
    pub fn ignore_create(&self, parent_uri: &FileUri, name: &str) -> Vec<FileUri> {
        let mut cursor = parent_uri.clone();
        let mut uris = Vec::new();
        let mut ignore = self.inner.ignore.lock();
        for segment in split_segments(name) {
            cursor = cursor.join(segment);
            ignore.events.insert(cursor.clone(), FileChangeType::Added);
            uris.push(cursor.clone());
        }
        uris
    }

    /// Drops ignore registrations, typically after the filesystem call failed.
    pub fn unignore(&self, uris: &[FileUri]) {
        let mut ignore = self.inner.ignore.lock();
        for uri in uris {
            ignore.events.remove(uri);
        }
        if ignore.once.as_ref().is_some_and(|once| uris.contains(once)) {
            ignore.once = None;
        }
    }

    /// Reflects a move the caller performed on the filesystem.
    ///
    /// Moves `id` under `new_parent` as `new_name`. If a node already lives
    /// at the destination, or a folded node is moved by its first segment,
    /// the destination directory is refreshed instead.
    /// In compact mode a move between directories refreshes both, since
    /// either chain may fold or unfold.
    pub fn move_node(&self, id: NodeId, new_parent: NodeId, new_name: &str) {
        let Some(plan) = self.inner.tree.with_store(|store| {
            let node = store.get(id)?;
            let parent = store.get(new_parent)?;
            let target_path = crate::node::child_path(parent.path(), new_name);
            Some(MovePlan {
                old_parent: node.parent()?,
                new_uri: parent.uri().join(new_name),
                // A folded chain moved by its head lands unfolded.
                needs_refresh: store.id_by_path(&target_path).is_some_and(|other| other != id)
                    || (node.is_compact() && !new_name.contains('/')),
            })
        }) else {
            return;
        };

        if plan.needs_refresh {
            tracing::debug!(uri = %plan.new_uri, "refreshing move destination");
            self.inner.tree.update(|store| store.dispose(id));
            self.refresh(Some(new_parent));
        } else {
            self.inner.tree.update(|store| {
                if !store.reparent(id, new_parent, new_name, plan.new_uri.clone()) {
                    store.dispose(id);
                }
            });
        }

        if self.is_compact() && plan.old_parent != new_parent {
            self.refresh(Some(plan.old_parent));
            self.refresh(Some(new_parent));
        }
        self.inner.tree.dispatch_change();
    }

    /// Reflects a create the caller performed on the filesystem.
    ///
    /// `name` may contain separators; intermediate directories are shown as
    /// the first segment, or as one folded node in compact mode. Returns the
    /// node shown for the new entry.
    pub async fn add_node(&self, parent: NodeId, name: &str, kind: NodeKind) -> Option<NodeId> {
        let (parent_uri, parent_is_root, loaded) = self.inner.tree.with_store(|store| {
            let node = store.get(parent)?;
            Some((node.uri().clone(), node.parent().is_none(), node.is_loaded()))
        })?;

        let segments = split_segments(name);
        let temp_name = match segments.as_slice() {
            [] => return None,
            [only] => (*only).to_string(),
            [first, ..] if !self.is_compact() || parent_is_root => (*first).to_string(),
            _ if kind == NodeKind::Directory => segments.join("/"),
            [init @ .., _] => init.join("/"),
        };
        let is_directory = kind == NodeKind::Directory || segments.len() > 1;
        let uri = parent_uri.join(&temp_name);

        if !loaded {
            self.load_children(parent).await;
        }

        let created = self.inner.tree.update(|store| {
            if !store.contains(parent) {
                return None;
            }
            if let Some(existing) = store.get_by_uri(&uri, false) {
                return Some(existing);
            }
            let stat = if is_directory {
                FileStat::directory(uri.clone())
            } else {
                FileStat::file(uri.clone())
            };
            let id = store.to_node(stat, parent, Some(temp_name.clone()));
            if store.attach(parent, id) {
                Some(id)
            } else {
                store.dispose(id);
                None
            }
        });
        if created.is_some() {
            self.inner.tree.dispatch_change();
        }
        created
    }

    /// Reflects a delete the caller performed on the filesystem.
    pub fn delete_node(&self, path: &str) {
        let Some(node) = self.get_node_by_path(path).and_then(|id| self.node(id)) else {
            return;
        };
        let Some(parent) = node.parent() else {
            return;
        };
        self.ignore_file_event(node.uri().clone(), FileChangeType::Deleted);
        self.remove(&node);
        if self.is_compact() {
            self.refresh(Some(parent));
        }
    }
}

impl fmt::Debug for FileTreeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTreeService")
            .field("tree", &self.inner.tree)
            .field("compact", &self.is_compact())
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

struct ResolveTarget {
    path: String,
    head_name: String,
    head_uri: FileUri,
    foldable: bool,
}

struct MovePlan {
    old_parent: NodeId,
    new_uri: FileUri,
    needs_refresh: bool,
}

fn split_segments(name: &str) -> Vec<&str> {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

// Replaces the children of `id` with `stats`, keeping ids of entries that
// are still there. Returns `true` if anything changed.
fn reconcile_children(store: &mut NodeStore, id: NodeId, stats: Vec<FileStat>) -> bool {
    let previous: Vec<NodeId> = store
        .get(id)
        .and_then(Node::children)
        .map(<[NodeId]>::to_vec)
        .unwrap_or_default();
    let was_loaded = store.get(id).is_some_and(Node::is_loaded);
    let mut by_name: HashMap<String, NodeId> = previous
        .iter()
        .filter_map(|child| store.get(*child))
        .map(|child| (child.head_name().to_string(), child.id()))
        .collect();

    let mut changed = !was_loaded;
    let mut children = Vec::with_capacity(stats.len());
    for stat in stats {
        let name = stat.uri.name().to_string();
        let kept = by_name.remove(&name).and_then(|existing| {
            let node = store.get(existing)?;
            if node.is_directory() == stat.is_directory {
                Some((existing, node.is_compact()))
            } else {
                store.dispose(existing);
                None
            }
        });
        match kept {
            Some((existing, compact)) => {
                if !compact {
                    store.update_stat(existing, stat);
                }
                children.push(existing);
            }
            None => {
                changed = true;
                children.push(store.to_node(stat, id, None));
            }
        }
    }

    for (_, gone) in by_name {
        changed = true;
        store.dispose(gone);
    }
    store.set_children(id, Some(children));
    changed
}

// Sorts by depth and drops paths lying under another queued path.
fn topmost_paths(mut paths: Vec<String>) -> Vec<String> {
    paths.sort_by_key(|path| path.matches('/').count());
    let mut kept: Vec<String> = Vec::new();
    for path in paths {
        let covered = kept
            .iter()
            .any(|top| *top == path || path.starts_with(&format!("{top}/")));
        if !covered {
            kept.push(path);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetree_vfs::{MemoryFileSystem, MemoryFsBuilder};
    use std::time::Duration;

    fn config(compact: bool) -> TreeConfig {
        TreeConfig {
            compact_folders: compact,
            ..TreeConfig::default()
        }
    }

    async fn service(fs: MemoryFileSystem, compact: bool) -> (FileTreeService, Arc<MemoryFileSystem>) {
        let fs = Arc::new(fs);
        let service = FileTreeService::new(fs.clone(), &config(compact));
        service.init(&FileUri::file("/w"), None).await;
        (service, fs)
    }

    fn names(service: &FileTreeService) -> Vec<String> {
        service
            .tree()
            .visible_nodes()
            .into_iter()
            .filter_map(|id| service.node(id))
            .map(|node| node.name().to_string())
            .collect()
    }

    #[test]
    fn test_topmost_paths() {
        let paths = vec![
            "/w/a/b".to_string(),
            "/w/c".to_string(),
            "/w/a".to_string(),
            "/w/ab".to_string(),
            "/w/a/b/c".to_string(),
        ];
        assert_eq!(topmost_paths(paths), vec!["/w/c", "/w/a", "/w/ab"]);
    }

    #[test]
    fn test_ignore_once_clears_after_use() {
        let mut state = IgnoreState {
            once: Some(FileUri::file("/w/a")),
            ..IgnoreState::default()
        };
        let kept = state.filter(vec![
            FileChange::added(FileUri::file("/w/a/x")),
            FileChange::added(FileUri::file("/w/b")),
        ]);
        assert_eq!(kept, vec![FileChange::added(FileUri::file("/w/b"))]);
        assert!(state.once.is_none());
    }

    #[test]
    fn test_ignore_map_matches_type() {
        let mut state = IgnoreState::default();
        state.events.insert(FileUri::file("/w/a"), FileChangeType::Added);

        let kept = state.filter(vec![FileChange::deleted(FileUri::file("/w/a"))]);
        assert_eq!(kept.len(), 1);

        let kept = state.filter(vec![FileChange::added(FileUri::file("/w/a"))]);
        assert!(kept.is_empty());
        assert!(state.events.is_empty());
    }

    #[tokio::test]
    async fn test_init_sorts_root_children() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/fileB.txt", "")
            .add_dir("/w/dirA")
            .add_file("/w/.env", "")
            .build()
            .unwrap();
        let (service, _) = service(fs, false).await;
        assert_eq!(names(&service), vec!["dirA", "fileB.txt", ".env"]);
    }

    #[tokio::test]
    async fn test_resolve_failure_degrades_to_empty() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/locked/secret", "")
            .add_file("/w/open/a.txt", "")
            .build()
            .unwrap();
        fs.deny_resolve("/w/locked").unwrap();
        let (service, _) = service(fs, false).await;

        let locked = service.get_node_by_uri(&FileUri::file("/w/locked")).unwrap();
        let open = service.get_node_by_uri(&FileUri::file("/w/open")).unwrap();
        assert!(service.expand(locked).await);
        assert!(service.expand(open).await);

        assert_eq!(names(&service), vec!["locked", "open", "a.txt"]);
        assert_eq!(service.node(locked).unwrap().children(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_compact_expand_folds_chain() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/a/b/c/d.txt", "")
            .add_file("/w/top.txt", "")
            .build()
            .unwrap();
        let (service, _) = service(fs, true).await;

        let a = service.get_node_by_uri(&FileUri::file("/w/a")).unwrap();
        service.expand(a).await;

        let folded = service.node(a).unwrap();
        assert_eq!(folded.name(), "a/b/c");
        assert_eq!(folded.uri().path(), "/w/a/b/c");
        assert_eq!(names(&service), vec!["a/b/c", "d.txt", "top.txt"]);
        assert_eq!(service.segment_uri(a, 1), Some(FileUri::file("/w/a/b")));
        assert_eq!(service.get_node_by_uri(&FileUri::file("/w/a/b")), Some(a));
    }

    #[tokio::test]
    async fn test_symlink_directories_do_not_fold() {
        let fs = MemoryFsBuilder::new()
            .add_symlink_dir("/w/link")
            .add_file("/w/link/only/x.txt", "")
            .build()
            .unwrap();
        let (service, _) = service(fs, true).await;

        let link = service.get_node_by_uri(&FileUri::file("/w/link")).unwrap();
        service.expand(link).await;
        assert_eq!(service.node(link).unwrap().name(), "link");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_ids_and_picks_up_changes() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/a.txt", "")
            .add_file("/w/b.txt", "")
            .build()
            .unwrap();
        let (service, fs) = service(fs, false).await;
        let a = service.get_node_by_uri(&FileUri::file("/w/a.txt")).unwrap();

        fs.insert("/w/c.txt", filetree_vfs::VfsEntry::file("")).unwrap();
        service.refresh(None);
        assert!(service.is_refreshing());
        service.wait_for_refresh().await;

        assert_eq!(names(&service), vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(service.get_node_by_uri(&FileUri::file("/w/a.txt")), Some(a));
        assert!(!service.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_refresh_does_not_render() {
        let fs = MemoryFsBuilder::new().add_file("/w/a.txt", "").build().unwrap();
        let (service, fs) = service(fs, false).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let structural = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let sink = Arc::clone(&structural);
        let _sub = service.tree().on_render(move |event| {
            if event.structural {
                sink.fetch_add(1, Ordering::SeqCst);
            }
        });

        service.refresh(None);
        service.wait_for_refresh().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(structural.load(Ordering::SeqCst), 0);

        fs.insert("/w/b.txt", filetree_vfs::VfsEntry::file("")).unwrap();
        service.refresh(None);
        service.wait_for_refresh().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(structural.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_flush_waits_for_delay() {
        let fs = MemoryFsBuilder::new().add_dir("/w").build().unwrap();
        let (service, fs) = service(fs, false).await;
        fs.clear_calls();

        service.refresh(None);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fs.calls().len(), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fs.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_added_and_deleted() {
        let fs = MemoryFsBuilder::new()
            .add_dir("/w/dirA")
            .add_file("/w/fileB.txt", "")
            .build()
            .unwrap();
        let (service, fs) = service(fs, false).await;
        service.start_watching();
        let dir_a = service.get_node_by_uri(&FileUri::file("/w/dirA")).unwrap();

        fs.write_file("/w/new.txt", "hi").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.wait_for_refresh().await;
        assert_eq!(names(&service), vec!["dirA", "fileB.txt", "new.txt"]);

        fs.emit(vec![FileChange::deleted(FileUri::file("/w/fileB.txt"))]);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(names(&service), vec!["dirA", "new.txt"]);
        assert_eq!(service.get_node_by_uri(&FileUri::file("/w/dirA")), Some(dir_a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_content_updates_are_ignored() {
        let fs = MemoryFsBuilder::new().add_file("/w/a.txt", "").build().unwrap();
        let (service, _) = service(fs, false).await;

        service.apply_changes(vec![FileChange::updated(FileUri::file("/w/a.txt"))]);
        assert!(!service.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_ancestor_cancels_queued_refresh() {
        let fs = MemoryFsBuilder::new().add_file("/w/a/x.txt", "").build().unwrap();
        let (service, _) = service(fs, false).await;
        let a = service.get_node_by_uri(&FileUri::file("/w/a")).unwrap();
        service.expand(a).await;

        service.apply_changes(vec![
            FileChange::added(FileUri::file("/w/a/y.txt")),
            FileChange::deleted(FileUri::file("/w/a")),
        ]);
        assert!(service.inner.queue.lock().is_empty());
        assert!(service.node(a).is_none());
    }

    #[tokio::test]
    async fn test_move_node_reparents_and_ignores_events() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/a.txt", "")
            .add_dir("/w/t")
            .build()
            .unwrap();
        let (service, _) = service(fs, false).await;
        let a = service.get_node_by_uri(&FileUri::file("/w/a.txt")).unwrap();
        let t = service.get_node_by_uri(&FileUri::file("/w/t")).unwrap();
        service.expand(t).await;

        let (from, to) = (FileUri::file("/w/a.txt"), FileUri::file("/w/t/a.txt"));
        service.ignore_move(&from, &to);
        service.move_node(a, t, "a.txt");
        assert_eq!(service.node(a).unwrap().path(), "/w/t/a.txt");

        service.apply_changes(vec![
            FileChange::deleted(FileUri::file("/w/a.txt")),
            FileChange::added(FileUri::file("/w/t/a.txt")),
        ]);
        assert!(!service.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_directory_move_drops_entry_events_for_one_batch() {
        let fs = MemoryFsBuilder::new()
            .add_file("/w/d/x.txt", "")
            .add_dir("/w/t")
            .build()
            .unwrap();
        let (service, _) = service(fs, false).await;
        let t = service.get_node_by_uri(&FileUri::file("/w/t")).unwrap();
        service.expand(t).await;

        service.ignore_move(&FileUri::file("/w/d"), &FileUri::file("/w/t/d"));
        service.apply_changes(vec![
            FileChange::deleted(FileUri::file("/w/d")),
            FileChange::added(FileUri::file("/w/t/d")),
            FileChange::added(FileUri::file("/w/t/d/x.txt")),
        ]);
        assert!(!service.is_refreshing());
        assert!(service.get_node_by_uri(&FileUri::file("/w/d")).is_some());
        assert!(service.inner.ignore.lock().events.is_empty());

        service.apply_changes(vec![FileChange::added(FileUri::file("/w/t/d/y.txt"))]);
        assert!(service.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_once_is_cleared_by_unignore() {
        let fs = MemoryFsBuilder::new().add_dir("/w/t").build().unwrap();
        let (service, _) = service(fs, false).await;
        let t = service.get_node_by_uri(&FileUri::file("/w/t")).unwrap();
        service.expand(t).await;

        service.ignore_file_event_once(Some(FileUri::file("/w/t")));
        service.apply_changes(vec![FileChange::added(FileUri::file("/w/t/a.txt"))]);
        assert!(!service.is_refreshing());

        service.ignore_file_event_once(Some(FileUri::file("/w/t")));
        service.unignore(&[FileUri::file("/w/t")]);
        service.apply_changes(vec![FileChange::added(FileUri::file("/w/t/b.txt"))]);
        assert!(service.is_refreshing());
    }

    #[tokio::test]
    async fn test_add_node_multi_segment_plain_mode() {
        let fs = MemoryFsBuilder::new().add_dir("/w/e").build().unwrap();
        let (service, fs) = service(fs, false).await;
        let e = service.get_node_by_uri(&FileUri::file("/w/e")).unwrap();
        service.expand(e).await;

        fs.insert("/w/e/a/b/c.txt", filetree_vfs::VfsEntry::file("")).unwrap();
        let ignored = service.ignore_create(&FileUri::file("/w/e"), "a/b/c.txt");
        assert_eq!(ignored.len(), 3);
        assert_eq!(ignored[2], FileUri::file("/w/e/a/b/c.txt"));
        let created = service.add_node(e, "a/b/c.txt", NodeKind::File).await.unwrap();
        let node = service.node(created).unwrap();
        assert_eq!(node.name(), "a");
        assert!(node.is_directory());
    }

    #[tokio::test]
    async fn test_delete_node_removes_and_ignores() {
        let fs = MemoryFsBuilder::new().add_file("/w/a.txt", "").build().unwrap();
        let (service, _) = service(fs, false).await;

        service.delete_node("/w/a.txt");
        assert!(names(&service).is_empty());
        service.apply_changes(vec![FileChange::deleted(FileUri::file("/w/a.txt"))]);
        assert!(!service.is_refreshing());
    }
}
