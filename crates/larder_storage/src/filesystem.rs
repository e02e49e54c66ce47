//! Filesystem-based content backend.
//!
//! This backend stores each written blob in its own file, named by a random
//! UUID and fanned out over two-character subdirectories.

use crate::ContentBackend;
use larder_error::{LarderResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem content backend.
///
/// Stores contents under:
/// `{base_path}/{id[0:2]}/{id}`
///
/// # Example Structure
///
/// ```text
/// /var/larder/contents/
/// ├── 3f/
/// │   └── 3f2a9c0e7b1d4c5e8f90a1b2c3d4e5f6
/// └── a7/
///     ├── a71c...
///     └── a7e0...
/// ```
///
/// # Features
///
/// - **Collision-free identifiers**: UUID v4, no shared counter
/// - **Atomic writes**: Uses a unique temp file + rename
/// - **Idempotent deletes**: Removing a missing id succeeds
#[derive(Debug, Clone)]
pub struct FileSystemContent {
    base_path: PathBuf,
}

impl FileSystemContent {
    /// Create a new filesystem content backend.
    ///
    /// Creates the base directory if it doesn't exist.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Root directory for stored contents
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> LarderResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created filesystem content backend");
        Ok(Self { base_path })
    }

    /// Root directory of this backend.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the filesystem path for an identifier.
    ///
    /// Identifiers must be 32 lowercase hex digits; anything else could
    /// address files outside the backend.
    fn get_path(&self, id: &str) -> LarderResult<PathBuf> {
        let valid = id.len() == 32
            && id
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "malformed content id '{}'",
                id
            )))
            .into());
        }

        Ok(self.base_path.join(&id[0..2]).join(id))
    }
}

#[async_trait::async_trait]
impl ContentBackend for FileSystemContent {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    #[tracing::instrument(skip(self, contents), fields(size = contents.len()))]
    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let path = self.get_path(&id)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, contents).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(id = %id, path = %path.display(), size = contents.len(), "Wrote contents");

        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>> {
        let path = self.get_path(id)?;

        match tokio::fs::read(&path).await {
            Ok(data) => {
                tracing::debug!(id, size = data.len(), "Read contents");
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn remove_contents(&self, id: &str) -> LarderResult<()> {
        let path = self.get_path(id)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(id, "Removed contents");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(id, "Contents already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "delete {}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }
}
