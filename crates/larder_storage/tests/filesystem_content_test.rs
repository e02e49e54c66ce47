//! Tests for the filesystem content backend.

use larder_storage::{ContentBackend, FileSystemContent};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_write_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileSystemContent::new(temp_dir.path()).unwrap();

    let id = backend.write_contents(b"Hello, world!").await.unwrap();
    assert_eq!(id.len(), 32);

    let contents = backend.read_contents(&id).await.unwrap();
    assert_eq!(contents.as_deref(), Some(&b"Hello, world!"[..]));

    // Fanned out under the first two characters of the id
    let path = temp_dir.path().join(&id[0..2]).join(&id);
    assert!(path.exists());
}

#[tokio::test]
async fn test_same_bytes_get_distinct_ids() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileSystemContent::new(temp_dir.path()).unwrap();

    let first = backend.write_contents(b"same").await.unwrap();
    let second = backend.write_contents(b"same").await.unwrap();
    assert_ne!(first, second);

    // Removing one leaves the other readable
    backend.remove_contents(&first).await.unwrap();
    assert_eq!(backend.read_contents(&first).await.unwrap(), None);
    assert_eq!(
        backend.read_contents(&second).await.unwrap(),
        Some(b"same".to_vec())
    );
}

#[tokio::test]
async fn test_concurrent_writes_get_unique_ids() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FileSystemContent::new(temp_dir.path()).unwrap());

    let mut handles = Vec::new();
    for i in 0..32u8 {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            backend.write_contents(&[i; 64]).await.unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 32);
}

#[tokio::test]
async fn test_read_unknown_id_is_none() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileSystemContent::new(temp_dir.path()).unwrap();

    let missing = "0123456789abcdef0123456789abcdef";
    assert_eq!(backend.read_contents(missing).await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileSystemContent::new(temp_dir.path()).unwrap();

    let id = backend.write_contents(b"bye").await.unwrap();
    backend.remove_contents(&id).await.unwrap();
    backend.remove_contents(&id).await.unwrap();
    assert_eq!(backend.read_contents(&id).await.unwrap(), None);
}

#[tokio::test]
async fn test_malformed_id_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileSystemContent::new(temp_dir.path()).unwrap();

    for id in ["", "../etc/passwd", "ABCDEF0123456789ABCDEF0123456789", "abc"] {
        assert!(backend.read_contents(id).await.is_err(), "accepted {id:?}");
        assert!(backend.remove_contents(id).await.is_err(), "accepted {id:?}");
    }
}

#[tokio::test]
async fn test_creates_base_directory() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("nested/contents");

    let backend = FileSystemContent::new(&base).unwrap();
    assert!(base.is_dir());
    assert_eq!(backend.base_path(), base.as_path());
}
