//! Integration tests driving the in-memory filesystem through `FileTreeApi`.

use filetree_core::traits::FileTreeApi;
use filetree_core::{FileChangeType, FileOperation, FileUri};
use filetree_vfs::{FsCall, MemoryFsBuilder};
use std::sync::Arc;

fn uri(path: &str) -> FileUri {
    FileUri::file(path)
}

/// The filesystem is usable as a trait object shared between tasks.
#[tokio::test]
async fn test_shared_trait_object() {
    let fs = Arc::new(
        MemoryFsBuilder::new()
            .add_dir("/w/dirA")
            .add_file("/w/fileB.txt", "b")
            .build()
            .unwrap(),
    );
    let api: Arc<dyn FileTreeApi> = fs.clone();

    let resolved = api.resolve_children(&uri("/w")).await.unwrap();
    assert_eq!(resolved.children.len(), 2);
    assert_eq!(fs.calls(), vec![FsCall::Resolve(uri("/w"))]);
}

/// Rename then delete produces the expected event sequence.
#[tokio::test]
async fn test_event_sequence() {
    let fs = MemoryFsBuilder::new()
        .add_file("/w/a.txt", "")
        .build()
        .unwrap();
    let mut events = fs.subscribe();

    fs.mv(&uri("/w/a.txt"), &uri("/w/b.txt")).await.unwrap();
    fs.delete(&uri("/w/b.txt")).await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first[0].change_type, FileChangeType::Deleted);
    assert_eq!(first[1].change_type, FileChangeType::Added);
    let second = events.recv().await.unwrap();
    assert_eq!(second[0].uri, uri("/w/b.txt"));
    assert_eq!(fs.mutation_count(), 2);
}

/// A failing call is still recorded, and nothing is broadcast.
#[tokio::test]
async fn test_failed_call_is_logged_without_events() {
    let fs = MemoryFsBuilder::new()
        .add_file("/w/a.txt", "")
        .build()
        .unwrap();
    fs.inject_failure(FileOperation::Move, "/w/a.txt", "locked")
        .unwrap();
    let mut events = fs.subscribe();

    let err = fs.mv(&uri("/w/a.txt"), &uri("/w/b.txt")).await.unwrap_err();

    assert!(err.is_operation_error());
    assert_eq!(fs.move_calls().len(), 1);
    assert!(events.try_recv().is_err());
}

/// Moving onto an existing entry fails.
#[tokio::test]
async fn test_move_onto_existing_fails() {
    let fs = MemoryFsBuilder::new()
        .add_file("/w/a.txt", "a")
        .add_file("/w/b.txt", "b")
        .build()
        .unwrap();

    assert!(fs.mv(&uri("/w/a.txt"), &uri("/w/b.txt")).await.is_err());
    assert_eq!(fs.read_file("/w/b.txt").unwrap(), "b");
}

/// Missing entries stat as `None`.
#[tokio::test]
async fn test_stat_missing() {
    let fs = MemoryFsBuilder::new().build().unwrap();
    assert!(fs.get_file_stat(&uri("/nope")).await.unwrap().is_none());
}
