//! In-memory content backend.
//!
//! Keeps contents in a HashMap protected by an RwLock. All data is lost when
//! the backend is dropped, which makes it a good fit for tests and
//! short-lived hosts.

use crate::ContentBackend;
use larder_error::LarderResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory content backend.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    contents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryContent {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs (for testing).
    pub async fn len(&self) -> usize {
        self.contents.read().await.len()
    }

    /// Check if the backend is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.contents.read().await.is_empty()
    }

    /// Check whether an identifier is present (for testing).
    pub async fn contains(&self, id: &str) -> bool {
        self.contents.read().await.contains_key(id)
    }
}

#[async_trait::async_trait]
impl ContentBackend for MemoryContent {
    fn name(&self) -> &'static str {
        "memory"
    }

    #[tracing::instrument(skip(self, contents), fields(size = contents.len()))]
    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.contents
            .write()
            .await
            .insert(id.clone(), contents.to_vec());
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>> {
        Ok(self.contents.read().await.get(id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_contents(&self, id: &str) -> LarderResult<()> {
        self.contents.write().await.remove(id);
        Ok(())
    }
}
