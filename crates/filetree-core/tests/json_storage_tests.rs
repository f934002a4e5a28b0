//! Integration tests for the JSON file snapshot storage.

use filetree_core::traits::SnapshotStorage;
use filetree_core::{ExpandedDirectories, JsonSnapshotStorage, TreeSnapshot, WorkspaceId};
use tempfile::TempDir;

fn sample_snapshot() -> TreeSnapshot {
    TreeSnapshot {
        expanded_directories: ExpandedDirectories {
            at_surface: vec!["src".to_string(), "src/model".to_string()],
            buried: vec!["docs/api".to_string()],
        },
        scroll_position: 66.0,
    }
}

#[tokio::test]
async fn test_save_then_load() {
    let temp = TempDir::new().unwrap();
    let storage = JsonSnapshotStorage::with_directory(temp.path().join("snapshots"));
    let workspace = WorkspaceId::new("file:///home/me/project");

    storage.save(&workspace, &sample_snapshot()).await.unwrap();

    let loaded = storage.load(&workspace).await.unwrap();
    assert_eq!(loaded, Some(sample_snapshot()));
}

#[tokio::test]
async fn test_file_is_named_after_storage_key() {
    let temp = TempDir::new().unwrap();
    let storage = JsonSnapshotStorage::with_directory(temp.path());
    let workspace = WorkspaceId::new("file:///w");

    storage.save(&workspace, &TreeSnapshot::default()).await.unwrap();

    let expected = temp.path().join(format!("{}.json", workspace.storage_key()));
    assert!(expected.exists());
    let content = std::fs::read_to_string(expected).unwrap();
    assert!(content.contains("expandedDirectories"));
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let temp = TempDir::new().unwrap();
    let storage = JsonSnapshotStorage::with_directory(temp.path());

    let loaded = storage.load(&WorkspaceId::new("file:///nothing")).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_corrupt_file_is_serialization_error() {
    let temp = TempDir::new().unwrap();
    let storage = JsonSnapshotStorage::with_directory(temp.path());
    let workspace = WorkspaceId::new("file:///w");
    std::fs::write(
        temp.path().join(format!("{}.json", workspace.storage_key())),
        "not json",
    )
    .unwrap();

    let err = storage.load(&workspace).await.unwrap_err();
    assert!(matches!(err, filetree_core::Error::SerializationError { .. }));
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let storage = JsonSnapshotStorage::with_directory(temp.path());
    let workspace = WorkspaceId::new("file:///w");

    storage.clear(&workspace).await.unwrap();
    storage.save(&workspace, &sample_snapshot()).await.unwrap();
    storage.clear(&workspace).await.unwrap();

    assert!(storage.load(&workspace).await.unwrap().is_none());
}
