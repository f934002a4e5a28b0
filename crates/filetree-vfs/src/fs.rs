//! In-memory filesystem implementation.
//!
//! Entries are stored in a `BTreeMap` keyed by path, so a directory and its
//! descendants are adjacent. Parents are created implicitly; the root `/`
//! always exists.
//!
//! # Examples
//!
//! ```
//! use filetree_core::traits::FileTreeApi;
//! use filetree_core::FileUri;
//! use filetree_vfs::MemoryFileSystem;
//!
//! # async fn example() -> filetree_core::Result<()> {
//! let fs = MemoryFileSystem::new();
//! let mut events = fs.subscribe();
//!
//! fs.create_file(&FileUri::file("/w/a.txt")).await?;
//!
//! let batch = events.recv().await.unwrap();
//! assert_eq!(batch.len(), 2); // "/w" and "/w/a.txt"
//! # Ok(())
//! # }
//! ```

use crate::types::{Result, VfsEntry, VfsError, VfsPath};
use async_trait::async_trait;
use filetree_core::traits::FileTreeApi;
use filetree_core::{FileChange, FileOperation, FileStat, FileUri, ResolvedChildren};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// A call received through [`FileTreeApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    /// `resolve_children`
    Resolve(FileUri),
    /// `get_file_stat`
    Stat(FileUri),
    /// `mv`
    Move {
        /// Source
        from: FileUri,
        /// Target
        to: FileUri,
    },
    /// `copy`
    Copy {
        /// Source
        from: FileUri,
        /// Target
        to: FileUri,
    },
    /// `delete`
    Delete(FileUri),
    /// `create_file`
    CreateFile(FileUri),
    /// `create_directory`
    CreateDirectory(FileUri),
}

impl FsCall {
    /// Returns `true` for calls that mutate the filesystem.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Resolve(_) | Self::Stat(_))
    }
}

#[derive(Debug)]
struct State {
    entries: BTreeMap<VfsPath, VfsEntry>,
    clock: i64,
    calls: Vec<FsCall>,
    failures: HashMap<(FileOperation, VfsPath), String>,
    latency: Option<Duration>,
}

impl State {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn subtree(&self, root: &VfsPath) -> Vec<VfsPath> {
        self.entries
            .keys()
            .filter(|path| *path == root || root.is_ancestor_of(path))
            .cloned()
            .collect()
    }

    fn injected(&self, operation: FileOperation, path: &VfsPath) -> Result<()> {
        match self.failures.get(&(operation, path.clone())) {
            Some(message) => Err(VfsError::Injected {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_parents(&mut self, path: &VfsPath, changes: &mut Vec<FileChange>) -> Result<()> {
        let mut missing = Vec::new();
        let mut cursor = path.parent();
        while let Some(parent) = cursor {
            match self.entries.get(&parent) {
                Some(entry) if entry.is_directory() => break,
                Some(_) => {
                    return Err(VfsError::NotADirectory {
                        path: parent.to_string(),
                    });
                }
                None => {
                    cursor = parent.parent();
                    missing.push(parent);
                }
            }
        }

        let time = self.tick();
        for parent in missing.into_iter().rev() {
            let mut entry = VfsEntry::directory();
            entry.touch(time);
            changes.push(FileChange::added(parent.to_uri()));
            self.entries.insert(parent, entry);
        }
        Ok(())
    }

    fn create(&mut self, path: &VfsPath, mut entry: VfsEntry) -> Result<Vec<FileChange>> {
        if self.entries.contains_key(path) {
            return Err(VfsError::AlreadyExists {
                path: path.to_string(),
            });
        }
        let mut changes = Vec::new();
        self.ensure_parents(path, &mut changes)?;
        entry.touch(self.tick());
        self.entries.insert(path.clone(), entry);
        changes.push(FileChange::added(path.to_uri()));
        Ok(changes)
    }

    fn check_transfer(&self, from: &VfsPath, to: &VfsPath) -> Result<()> {
        if from.is_root() || !self.entries.contains_key(from) {
            return Err(VfsError::FileNotFound {
                path: from.to_string(),
            });
        }
        if self.entries.contains_key(to) {
            return Err(VfsError::AlreadyExists {
                path: to.to_string(),
            });
        }
        if from.is_ancestor_of(to) {
            return Err(VfsError::IntoOwnSubtree {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let parent = to.parent().unwrap_or_else(VfsPath::root);
        match self.entries.get(&parent) {
            Some(entry) if entry.is_directory() => Ok(()),
            Some(_) => Err(VfsError::NotADirectory {
                path: parent.to_string(),
            }),
            None => Err(VfsError::FileNotFound {
                path: parent.to_string(),
            }),
        }
    }

    fn transfer(&mut self, from: &VfsPath, to: &VfsPath, keep_source: bool) -> Result<()> {
        self.check_transfer(from, to)?;
        let time = self.tick();
        for path in self.subtree(from) {
            let entry = if keep_source {
                self.entries.get(&path).cloned()
            } else {
                self.entries.remove(&path)
            };
            if let (Some(mut entry), Some(target)) = (entry, path.rebase(from, to)) {
                entry.touch(time);
                self.entries.insert(target, entry);
            }
        }
        Ok(())
    }
}

/// In-memory implementation of [`FileTreeApi`].
///
/// Mutations made through the trait (or through [`Self::write_file`])
/// broadcast change events to every subscriber. Entries inserted through
/// [`Self::insert`] do not.
#[derive(Debug)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
    events: broadcast::Sender<Vec<FileChange>>,
    home: Option<FileUri>,
}

impl MemoryFileSystem {
    /// Creates a filesystem containing only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(VfsPath::root(), VfsEntry::directory());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(State {
                entries,
                clock: 0,
                calls: Vec::new(),
                failures: HashMap::new(),
                latency: None,
            }),
            events,
            home: None,
        }
    }

    /// Sets the home directory reported by [`FileTreeApi::user_home`].
    #[must_use]
    pub fn with_home(mut self, home: FileUri) -> Self {
        self.home = Some(home);
        self
    }

    /// Inserts an entry without broadcasting events, creating missing parents.
    ///
    /// An existing entry at `path` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or an ancestor is a file.
    pub fn insert(&self, path: impl AsRef<str>, entry: VfsEntry) -> Result<()> {
        let path = VfsPath::new(path)?;
        let mut state = self.state.lock();
        state.ensure_parents(&path, &mut Vec::new())?;
        state.entries.insert(path, entry);
        Ok(())
    }

    /// Returns `true` if an entry exists at `path`.
    #[must_use]
    pub fn exists(&self, path: impl AsRef<str>) -> bool {
        VfsPath::new(path).is_ok_and(|p| self.state.lock().entries.contains_key(&p))
    }

    /// Reads the content of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is missing or is a directory.
    pub fn read_file(&self, path: impl AsRef<str>) -> Result<String> {
        let path = VfsPath::new(path)?;
        match self.state.lock().entries.get(&path) {
            Some(VfsEntry::File { content, .. }) => Ok(content.clone()),
            Some(VfsEntry::Directory { .. }) => Err(VfsError::InvalidPath {
                path: path.to_string(),
            }),
            None => Err(VfsError::FileNotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Writes a file and broadcasts `Updated` (or `Added` if it was missing).
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or is a directory.
    pub fn write_file(&self, path: impl AsRef<str>, content: impl Into<String>) -> Result<()> {
        let path = VfsPath::new(path)?;
        let changes = {
            let mut state = self.state.lock();
            let time = state.tick();
            match state.entries.get_mut(&path) {
                Some(VfsEntry::File {
                    content: current,
                    modified,
                }) => {
                    *current = content.into();
                    *modified = time;
                    vec![FileChange::updated(path.to_uri())]
                }
                Some(VfsEntry::Directory { .. }) => {
                    return Err(VfsError::InvalidPath {
                        path: path.to_string(),
                    });
                }
                None => state.create(&path, VfsEntry::file(content))?,
            }
        };
        self.broadcast(changes);
        Ok(())
    }

    /// Returns every stored path in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<VfsPath> {
        self.state.lock().entries.keys().cloned().collect()
    }

    /// Returns the calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<FsCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the `(from, to)` pairs of every `mv` call.
    #[must_use]
    pub fn move_calls(&self) -> Vec<(FileUri, FileUri)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                FsCall::Move { from, to } => Some((from.clone(), to.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns how many calls mutated the filesystem.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .count()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Makes `operation` on `path` fail with `message` until cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid.
    pub fn inject_failure(
        &self,
        operation: FileOperation,
        path: impl AsRef<str>,
        message: impl Into<String>,
    ) -> Result<()> {
        let path = VfsPath::new(path)?;
        self.state
            .lock()
            .failures
            .insert((operation, path), message.into());
        Ok(())
    }

    /// Makes listing `path` fail with "permission denied".
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid.
    pub fn deny_resolve(&self, path: impl AsRef<str>) -> Result<()> {
        self.inject_failure(FileOperation::Resolve, path, "permission denied")
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Delays every trait call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    /// Broadcasts a batch of events, as an external watcher would.
    pub fn emit(&self, changes: Vec<FileChange>) {
        self.broadcast(changes);
    }

    fn broadcast(&self, changes: Vec<FileChange>) {
        if changes.is_empty() {
            return;
        }
        tracing::trace!(count = changes.len(), "broadcasting file changes");
        // No subscriber is not an error.
        let _ = self.events.send(changes);
    }

    async fn delay(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn mutate(
        &self,
        call: FsCall,
        operation: FileOperation,
        uri: &FileUri,
        apply: impl FnOnce(&mut State, &VfsPath) -> Result<Vec<FileChange>>,
    ) -> filetree_core::Result<()> {
        let changes = {
            let mut state = self.state.lock();
            state.calls.push(call);
            VfsPath::from_uri(uri)
                .and_then(|path| {
                    state.injected(operation, &path)?;
                    apply(&mut state, &path)
                })
                .map_err(|e| e.into_engine_error(operation, uri))?
        };
        self.broadcast(changes);
        Ok(())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileTreeApi for MemoryFileSystem {
    async fn resolve_children(&self, uri: &FileUri) -> filetree_core::Result<ResolvedChildren> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(FsCall::Resolve(uri.clone()));

        let listing = VfsPath::from_uri(uri).and_then(|path| {
            state.injected(FileOperation::Resolve, &path)?;
            match state.entries.get(&path) {
                Some(entry) if entry.is_directory() => {
                    let children = state
                        .entries
                        .iter()
                        .filter(|(child, _)| child.parent().as_ref() == Some(&path))
                        .map(|(child, entry)| entry.stat(child))
                        .collect();
                    Ok(ResolvedChildren {
                        children,
                        filestat: Some(entry.stat(&path)),
                    })
                }
                Some(_) => Err(VfsError::NotADirectory {
                    path: path.to_string(),
                }),
                None => Err(VfsError::FileNotFound {
                    path: path.to_string(),
                }),
            }
        });

        listing.map_err(|e| e.into_engine_error(FileOperation::Resolve, uri))
    }

    async fn get_file_stat(&self, uri: &FileUri) -> filetree_core::Result<Option<FileStat>> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(FsCall::Stat(uri.clone()));
        Ok(VfsPath::from_uri(uri)
            .ok()
            .and_then(|path| state.entries.get(&path).map(|entry| entry.stat(&path))))
    }

    async fn mv(&self, from: &FileUri, to: &FileUri) -> filetree_core::Result<()> {
        self.delay().await;
        let call = FsCall::Move {
            from: from.clone(),
            to: to.clone(),
        };
        let target = VfsPath::from_uri(to).map_err(|e| e.into_engine_error(FileOperation::Move, to))?;
        self.mutate(call, FileOperation::Move, from, |state, source| {
            state.transfer(source, &target, false)?;
            Ok(vec![
                FileChange::deleted(source.to_uri()),
                FileChange::added(target.to_uri()),
            ])
        })
    }

    async fn copy(&self, from: &FileUri, to: &FileUri) -> filetree_core::Result<()> {
        self.delay().await;
        let call = FsCall::Copy {
            from: from.clone(),
            to: to.clone(),
        };
        let target = VfsPath::from_uri(to).map_err(|e| e.into_engine_error(FileOperation::Copy, to))?;
        self.mutate(call, FileOperation::Copy, from, |state, source| {
            state.transfer(source, &target, true)?;
            Ok(vec![FileChange::added(target.to_uri())])
        })
    }

    async fn delete(&self, uri: &FileUri) -> filetree_core::Result<()> {
        self.delay().await;
        self.mutate(
            FsCall::Delete(uri.clone()),
            FileOperation::Delete,
            uri,
            |state, path| {
                if path.is_root() || !state.entries.contains_key(path) {
                    return Err(VfsError::FileNotFound {
                        path: path.to_string(),
                    });
                }
                for doomed in state.subtree(path) {
                    state.entries.remove(&doomed);
                }
                Ok(vec![FileChange::deleted(path.to_uri())])
            },
        )
    }

    async fn create_file(&self, uri: &FileUri) -> filetree_core::Result<()> {
        self.delay().await;
        self.mutate(
            FsCall::CreateFile(uri.clone()),
            FileOperation::CreateFile,
            uri,
            |state, path| state.create(path, VfsEntry::file("")),
        )
    }

    async fn create_directory(&self, uri: &FileUri) -> filetree_core::Result<()> {
        self.delay().await;
        self.mutate(
            FsCall::CreateDirectory(uri.clone()),
            FileOperation::CreateDirectory,
            uri,
            |state, path| state.create(path, VfsEntry::directory()),
        )
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>> {
        self.events.subscribe()
    }

    fn user_home(&self) -> Option<FileUri> {
        self.home.clone()
    }
}
