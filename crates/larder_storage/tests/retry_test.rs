//! Tests for the retrying backend decorator.

use larder_storage::{
    BackendConfig, ContentBackend, LarderResult, MemoryContent, RetryConfig, RetryConfigBuilder,
    RetryingContent, StorageError, StorageErrorKind, build_backend,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fails a fixed number of times before delegating to memory.
struct FlakyBackend {
    inner: MemoryContent,
    failures_left: AtomicUsize,
    calls: Arc<AtomicUsize>,
    kind: StorageErrorKind,
}

impl FlakyBackend {
    fn new(failures: usize, kind: StorageErrorKind) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Self {
            inner: MemoryContent::new(),
            failures_left: AtomicUsize::new(failures),
            calls: calls.clone(),
            kind,
        };
        (backend, calls)
    }

    fn check(&self) -> LarderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::new(self.kind.clone()).into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentBackend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String> {
        self.check()?;
        self.inner.write_contents(contents).await
    }

    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>> {
        self.check()?;
        self.inner.read_contents(id).await
    }

    async fn remove_contents(&self, id: &str) -> LarderResult<()> {
        self.check()?;
        self.inner.remove_contents(id).await
    }
}

fn fast_retry(max_retries: usize) -> RetryConfig {
    RetryConfigBuilder::default()
        .initial_backoff_ms(1u64)
        .max_retries(max_retries)
        .max_delay_secs(1u64)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (flaky, calls) = FlakyBackend::new(2, StorageErrorKind::Unavailable("disk busy".into()));
    let backend = RetryingContent::new(flaky, fast_retry(3));

    let id = backend.write_contents(b"data").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(
        backend.read_contents(&id).await.unwrap(),
        Some(b"data".to_vec())
    );
    assert_eq!(backend.name(), "flaky");
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let (flaky, calls) = FlakyBackend::new(10, StorageErrorKind::Unavailable("offline".into()));
    let backend = RetryingContent::new(flaky, fast_retry(2));

    let err = backend.write_contents(b"data").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(backend.inner().inner.is_empty().await);
}

#[tokio::test]
async fn test_permanent_failures_fail_fast() {
    let (flaky, calls) = FlakyBackend::new(1, StorageErrorKind::InvalidPath("bad id".into()));
    let backend = RetryingContent::new(flaky, fast_retry(3));

    let err = backend.read_contents("whatever").await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_build_backend_from_config() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = BackendConfig::Filesystem {
        path: temp_dir.path().join("contents"),
    };

    let backend = build_backend(&config, Some(&fast_retry(1))).unwrap();
    assert_eq!(backend.name(), "filesystem");

    let id = backend.write_contents(b"abc").await.unwrap();
    assert_eq!(
        backend.read_contents(&id).await.unwrap(),
        Some(b"abc".to_vec())
    );

    let memory = build_backend(&BackendConfig::Memory, None).unwrap();
    assert_eq!(memory.name(), "memory");
}

#[cfg(not(feature = "database"))]
#[test]
fn test_postgres_requires_feature() {
    let config = BackendConfig::Postgres {
        database_url: None,
        pool_size: 1,
    };
    assert!(build_backend(&config, None).is_err());
}
