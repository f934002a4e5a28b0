//! Local filesystem backend built on `tokio::fs`.
//!
//! There is no OS watcher: change events are broadcast for the mutations
//! made through this backend only, which is what the tree needs to stay in
//! sync with its own edits.

use async_trait::async_trait;
use filetree_core::traits::FileTreeApi;
use filetree_core::{
    Error, FileChange, FileOperation, FileStat, FileUri, ResolvedChildren, Result,
};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// [`FileTreeApi`] over the local disk.
#[derive(Debug)]
pub struct LocalFileSystem {
    events: broadcast::Sender<Vec<FileChange>>,
    home: Option<FileUri>,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFileSystem {
    /// Creates a backend; the home directory comes from the environment.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            home: dirs::home_dir().map(|home| FileUri::file(home.to_string_lossy())),
        }
    }

    /// Overrides the home directory used for `~` tooltips.
    #[must_use]
    pub fn with_home(mut self, home: Option<FileUri>) -> Self {
        self.home = home;
        self
    }

    fn emit(&self, changes: Vec<FileChange>) {
        // Nobody listening is fine.
        let _ = self.events.send(changes);
    }
}

fn to_path(uri: &FileUri) -> PathBuf {
    PathBuf::from(uri.path())
}

fn failed(operation: FileOperation, uri: &FileUri, error: &io::Error) -> Error {
    Error::operation(operation, uri.to_string(), error.to_string())
}

async fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

async fn refuse_existing(operation: FileOperation, uri: &FileUri) -> Result<()> {
    if exists(&to_path(uri)).await {
        return Err(Error::operation(
            operation,
            uri.to_string(),
            "target already exists",
        ));
    }
    Ok(())
}

// Symbolic links report the kind of what they point to; dangling links
// show up as files.
async fn read_stat(path: &Path, uri: FileUri) -> io::Result<FileStat> {
    let metadata = fs::symlink_metadata(path).await?;
    let is_symlink = metadata.file_type().is_symlink();
    let metadata = if is_symlink {
        fs::metadata(path).await.unwrap_or(metadata)
    } else {
        metadata
    };

    let modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |since| i64::try_from(since.as_millis()).unwrap_or(i64::MAX));

    let stat = if metadata.is_dir() {
        FileStat::directory(uri)
    } else {
        FileStat::file(uri).with_size(metadata.len())
    };
    Ok(stat.with_modified(modified).with_symlink(is_symlink))
}

fn copy_tree<'a>(
    from: &'a Path,
    to: &'a Path,
) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir(to).await?;
        let mut entries = fs::read_dir(from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let source = entry.path();
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_tree(&source, &target).await?;
            } else {
                fs::copy(&source, &target).await?;
            }
        }
        Ok(())
    })
}

// Highest ancestor of `uri` (or `uri` itself) that does not exist yet.
async fn first_missing(uri: &FileUri) -> FileUri {
    let mut missing = uri.clone();
    while let Some(parent) = missing.parent() {
        if exists(&to_path(&parent)).await {
            break;
        }
        missing = parent;
    }
    missing
}

#[async_trait]
impl FileTreeApi for LocalFileSystem {
    async fn resolve_children(&self, uri: &FileUri) -> Result<ResolvedChildren> {
        let path = to_path(uri);
        let resolve_failed = |e: io::Error| Error::ResolveFailed {
            uri: uri.to_string(),
            message: e.to_string(),
        };

        let filestat = read_stat(&path, uri.clone())
            .await
            .map_err(resolve_failed)?;
        let mut entries = fs::read_dir(&path).await.map_err(resolve_failed)?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(resolve_failed)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            match read_stat(&entry.path(), uri.join(&name)).await {
                Ok(stat) => children.push(stat),
                Err(e) => tracing::warn!(entry = %entry.path().display(), error = %e, "skipping unreadable entry"),
            }
        }

        tracing::trace!(uri = %uri, count = children.len(), "resolved directory");
        Ok(ResolvedChildren {
            children,
            filestat: Some(filestat),
        })
    }

    async fn get_file_stat(&self, uri: &FileUri) -> Result<Option<FileStat>> {
        match read_stat(&to_path(uri), uri.clone()).await {
            Ok(stat) => Ok(Some(stat)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(failed(FileOperation::Resolve, uri, &e)),
        }
    }

    async fn mv(&self, from: &FileUri, to: &FileUri) -> Result<()> {
        refuse_existing(FileOperation::Move, to).await?;
        fs::rename(to_path(from), to_path(to))
            .await
            .map_err(|e| failed(FileOperation::Move, from, &e))?;

        tracing::debug!(from = %from, to = %to, "moved");
        self.emit(vec![
            FileChange::deleted(from.clone()),
            FileChange::added(to.clone()),
        ]);
        Ok(())
    }

    async fn copy(&self, from: &FileUri, to: &FileUri) -> Result<()> {
        refuse_existing(FileOperation::Copy, to).await?;
        let source = to_path(from);
        let target = to_path(to);
        let is_dir = fs::metadata(&source)
            .await
            .map_err(|e| failed(FileOperation::Copy, from, &e))?
            .is_dir();

        let copied = if is_dir {
            copy_tree(&source, &target).await
        } else {
            fs::copy(&source, &target).await.map(|_| ())
        };
        copied.map_err(|e| failed(FileOperation::Copy, from, &e))?;

        tracing::debug!(from = %from, to = %to, "copied");
        self.emit(vec![FileChange::added(to.clone())]);
        Ok(())
    }

    async fn delete(&self, uri: &FileUri) -> Result<()> {
        let path = to_path(uri);
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| failed(FileOperation::Delete, uri, &e))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removed.map_err(|e| failed(FileOperation::Delete, uri, &e))?;

        tracing::debug!(uri = %uri, "deleted");
        self.emit(vec![FileChange::deleted(uri.clone())]);
        Ok(())
    }

    async fn create_file(&self, uri: &FileUri) -> Result<()> {
        refuse_existing(FileOperation::CreateFile, uri).await?;
        let created = first_missing(uri).await;
        let path = to_path(uri);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(FileOperation::CreateFile, uri, &e))?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| failed(FileOperation::CreateFile, uri, &e))?;

        tracing::debug!(uri = %uri, "created file");
        self.emit(vec![FileChange::added(created)]);
        Ok(())
    }

    async fn create_directory(&self, uri: &FileUri) -> Result<()> {
        refuse_existing(FileOperation::CreateDirectory, uri).await?;
        let created = first_missing(uri).await;
        fs::create_dir_all(to_path(uri))
            .await
            .map_err(|e| failed(FileOperation::CreateDirectory, uri, &e))?;

        tracing::debug!(uri = %uri, "created directory");
        self.emit(vec![FileChange::added(created)]);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>> {
        self.events.subscribe()
    }

    fn user_home(&self) -> Option<FileUri> {
        self.home.clone()
    }
}
