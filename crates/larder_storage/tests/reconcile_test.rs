//! Tests for reconciling record file lists against storage.

use larder_storage::{
    FileSet, FileStorage, MemoryContent, StorageConfigBuilder, StoredFiles, StoredObject,
    UploadedFile, Uploads, name_to_id,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn storage(web_root: &Path) -> (FileStorage, MemoryContent) {
    let backend = MemoryContent::new();
    let config = StorageConfigBuilder::default()
        .web_root(web_root)
        .build()
        .unwrap();
    let storage = FileStorage::new(config, Arc::new(backend.clone())).unwrap();
    (storage, backend)
}

async fn stage(storage: &FileStorage, filename: &str, contents: &[u8]) -> String {
    let uploads: Uploads = [UploadedFile::new(
        "file",
        filename,
        "application/octet-stream",
        contents.to_vec(),
    )]
    .into_iter()
    .collect();
    storage.prepare(&uploads, "file", None).await.unwrap()
}

async fn persist(storage: &FileStorage, filename: &str, contents: &[u8]) -> String {
    let staged = stage(storage, filename, contents).await;
    storage.store(&staged, true).await.unwrap()
}

/// Records what the engine hands back without rewriting its lists.
#[derive(Default)]
struct RecordingObject {
    old: Vec<String>,
    current: Vec<String>,
    received: Option<StoredFiles>,
}

impl StoredObject for RecordingObject {
    fn old_files(&self) -> Vec<String> {
        self.old.clone()
    }

    fn files(&self) -> Vec<String> {
        self.current.clone()
    }

    fn set_files(&mut self, stored: StoredFiles) {
        self.received = Some(stored);
    }
}

#[tokio::test]
async fn test_store_object_is_additive() {
    let web = TempDir::new().unwrap();
    let (storage, backend) = storage(web.path());

    let kept = persist(&storage, "a.png", b"A").await;
    let dropped = persist(&storage, "b.png", b"B").await;
    let staged = stage(&storage, "c.png", b"C").await;

    let mut object = RecordingObject {
        old: vec![kept.clone(), dropped.clone()],
        current: vec![kept.clone(), staged.clone()],
        received: None,
    };

    let report = storage.store_object(&mut object).await;
    assert!(report.is_clean());
    assert_eq!(report.removed(), &vec![dropped.clone()]);

    let received = object.received.expect("set_files called");
    assert_eq!(received.len(), 1);
    let public = received[&staged].clone().expect("staged file stored");
    assert!(public.starts_with("/public/"));
    assert!(public.ends_with("/c.png"));

    // One write for the staged file, one delete for the dropped one
    assert_eq!(backend.len().await, 2);
    let kept_id = name_to_id(&kept, storage.public_root()).unwrap();
    let dropped_id = name_to_id(&dropped, storage.public_root()).unwrap();
    assert!(backend.contains(&kept_id).await);
    assert!(!backend.contains(&dropped_id).await);

    assert_eq!(storage.cache(&kept).await.unwrap(), b"A");
    assert_eq!(storage.cache(&public).await.unwrap(), b"C");
    assert!(storage.cache(&dropped).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_store_object_unchanged_record_is_noop() {
    let web = TempDir::new().unwrap();
    let (storage, backend) = storage(web.path());

    let a = persist(&storage, "a.png", b"A").await;
    let mut object = FileSet::persisted(vec![a.clone(), "https://cdn.example/x.png".to_string()]);

    let report = storage.store_object(&mut object).await;
    assert!(report.is_clean());
    assert!(report.stored().is_empty());
    assert!(report.removed().is_empty());
    assert_eq!(backend.len().await, 1);
    assert_eq!(object.files(), vec![a, "https://cdn.example/x.png".to_string()]);
}

#[tokio::test]
async fn test_store_object_reports_failed_staging() {
    let web = TempDir::new().unwrap();
    let (storage, backend) = storage(web.path());

    let good = stage(&storage, "good.png", b"G").await;
    let vanished = stage(&storage, "gone.png", b"X").await;
    std::fs::remove_file(web.path().join(vanished.trim_start_matches('/'))).unwrap();

    let mut object = FileSet::new();
    object.push(good.clone());
    object.push(vanished.clone());

    let report = storage.store_object(&mut object).await;
    assert!(!report.is_clean());
    assert_eq!(report.failed(), &vec![vanished.clone()]);
    assert_eq!(report.stored()[&vanished], None);
    assert_eq!(backend.len().await, 1);

    // The failed reference stays in place for a later attempt
    let files = object.files();
    assert!(files[0].starts_with("/public/"));
    assert_eq!(files[1], vanished);
    assert_eq!(object.old_files(), files);
}

#[tokio::test]
async fn test_remove_object_removes_union() {
    let web = TempDir::new().unwrap();
    let (storage, backend) = storage(web.path());

    let a = persist(&storage, "a.png", b"A").await;
    let b = persist(&storage, "b.png", b"B").await;
    let c = persist(&storage, "c.png", b"C").await;
    let staged = stage(&storage, "d.png", b"D").await;

    let object = RecordingObject {
        old: vec![a.clone(), b.clone()],
        current: vec![b.clone(), c.clone(), staged.clone()],
        received: None,
    };

    let report = storage.remove_object(&object).await;
    assert!(report.is_clean());
    assert_eq!(report.removed(), &vec![a, b, c]);
    assert!(backend.is_empty().await);
    assert!(object.received.is_none());

    // Staged uploads are left for the host to clean up
    assert!(web.path().join(staged.trim_start_matches('/')).exists());
}

#[tokio::test]
async fn test_cache_object_materializes_public_files() {
    let web = TempDir::new().unwrap();
    let (storage, _backend) = storage(web.path());

    let a = persist(&storage, "a.png", b"A").await;
    let b = persist(&storage, "b.png", b"B").await;
    let staged = stage(&storage, "c.png", b"C").await;

    let object = FileSet::persisted(vec![a.clone(), b.clone(), staged]);

    let report = storage.cache_object(&object).await;
    assert!(report.is_clean());
    assert_eq!(report.cached(), &vec![a.clone(), b.clone()]);
    assert!(storage.cache_path(&a).unwrap().exists());
    assert!(storage.cache_path(&b).unwrap().exists());
}

#[tokio::test]
async fn test_save_then_delete_record() {
    let web = TempDir::new().unwrap();
    let (storage, backend) = storage(web.path());

    let mut record = FileSet::new();
    record.push(stage(&storage, "one.txt", b"1").await);
    record.push(stage(&storage, "two.txt", b"2").await);
    assert!(storage.store_object(&mut record).await.is_clean());
    assert_eq!(backend.len().await, 2);

    let first = record.files()[0].clone();
    assert!(record.detach(&first));
    assert!(storage.store_object(&mut record).await.is_clean());
    assert_eq!(backend.len().await, 1);

    assert!(storage.remove_object(&record).await.is_clean());
    assert!(backend.is_empty().await);
}
