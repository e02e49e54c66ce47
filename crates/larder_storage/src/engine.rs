//! The storage engine: staging, persisting, caching and removing single files.

use crate::{
    ContentBackend, StorageConfig, UploadSource, generate_tmp_name, generate_unique_name,
    namespace_root, parse_public, resolve, sanitize_filename, strip_mount_prefix,
};
use larder_error::{
    LarderResult, StorageError, StorageErrorKind, UploadError, UploadErrorKind,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Orchestrates the temporary and public namespaces over a content backend.
///
/// Every reference handed out or accepted is a path relative to the web
/// root, optionally carrying the configured mount prefix:
///
/// ```text
/// {prefix}{tmp_path}/{token}/{filename}     staged upload
/// {prefix}{public_path}/{id}/{filename}     stored file, cached on demand
/// ```
///
/// The engine holds no mutable state of its own; it is safe to share behind
/// an `Arc` across concurrent requests.
///
/// # Example
///
/// ```no_run
/// use larder_storage::{FileStorage, MemoryContent, StorageConfig, UploadedFile, Uploads};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = FileStorage::new(StorageConfig::default(), Arc::new(MemoryContent::new()))?;
///
/// let uploads: Uploads = [UploadedFile::new("avatar", "pic.png", "image/png", b"PNGDATA".to_vec())]
///     .into_iter()
///     .collect();
///
/// let staged = storage
///     .prepare(&uploads, "avatar", Some(["image/png"].as_slice()))
///     .await?;
/// let public = storage.store(&staged, true).await?;
/// let bytes = storage.cache(&public).await?;
/// assert_eq!(bytes, b"PNGDATA");
/// # Ok(())
/// # }
/// ```
pub struct FileStorage {
    config: StorageConfig,
    backend: Arc<dyn ContentBackend>,
    public_root: String,
    tmp_root: String,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl FileStorage {
    /// Create an engine over `backend`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the namespace layout is invalid.
    pub fn new(config: StorageConfig, backend: Arc<dyn ContentBackend>) -> LarderResult<Self> {
        config.validate()?;

        let public_root = namespace_root(config.prefix(), config.public_path());
        let tmp_root = namespace_root(config.prefix(), config.tmp_path());

        tracing::info!(
            backend = backend.name(),
            web_root = %config.web_root().display(),
            public_root = %public_root,
            tmp_root = %tmp_root,
            "Created file storage"
        );

        Ok(Self {
            config,
            backend,
            public_root,
            tmp_root,
        })
    }

    /// Namespace layout.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Content backend.
    pub fn backend(&self) -> &Arc<dyn ContentBackend> {
        &self.backend
    }

    /// Leading string of every public reference, e.g. `/public/`.
    pub fn public_root(&self) -> &str {
        &self.public_root
    }

    /// Leading string of every staged reference, e.g. `/upload/`.
    pub fn tmp_root(&self) -> &str {
        &self.tmp_root
    }

    /// Build a fresh staged reference for `filename`, prefix included.
    pub fn generate_tmp_name(&self, filename: &str) -> LarderResult<String> {
        let filename = sanitize_filename(filename)?;
        Ok(format!(
            "{}{}/{}",
            self.config.prefix(),
            generate_tmp_name(self.config.tmp_path()),
            filename
        ))
    }

    /// On-disk location of the cache entry for a public reference.
    pub fn cache_path(&self, reference: &str) -> LarderResult<PathBuf> {
        let name = parse_public(reference, &self.public_root)?;
        resolve(
            self.config.web_root(),
            &format!("{}/{}/{}", self.config.public_path(), name.id, name.filename),
        )
    }

    /// Stage the upload submitted under `field` in the temporary namespace.
    ///
    /// When `allowed_types` is given, the declared MIME type must match one
    /// of them, ignoring case.
    ///
    /// # Returns
    ///
    /// The staged reference, `{prefix}{tmp_path}/{token}/{filename}`
    #[tracing::instrument(skip(self, uploads, allowed_types))]
    pub async fn prepare<U>(
        &self,
        uploads: &U,
        field: &str,
        allowed_types: Option<&[&str]>,
    ) -> LarderResult<String>
    where
        U: UploadSource + ?Sized,
    {
        let file = uploads
            .upload(field)
            .ok_or_else(|| UploadError::new(UploadErrorKind::Missing(field.to_string())))?;

        if let Some(types) = allowed_types {
            let content_type = file.content_type().to_lowercase();
            if !types.iter().any(|t| t.to_lowercase() == content_type) {
                return Err(UploadError::new(UploadErrorKind::TypeNotAllowed {
                    content_type,
                    allowed: types.join(", "),
                })
                .into());
            }
        }

        let reference = self.generate_tmp_name(file.filename())?;
        let path = resolve(
            self.config.web_root(),
            strip_mount_prefix(&reference, self.config.prefix())?,
        )?;

        if let Some(dir_path) = path.parent() {
            tokio::fs::create_dir_all(dir_path).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    dir_path.display(),
                    e
                )))
            })?;
        }

        tokio::fs::write(&path, file.contents()).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        tracing::info!(
            reference = %reference,
            size = file.contents().len(),
            content_type = %file.content_type(),
            "Staged upload"
        );

        Ok(reference)
    }

    /// Persist the file at `reference` in the backend.
    ///
    /// Reads the bytes, writes them to the backend and, when
    /// `remove_original` is set, discards the source file and its directory.
    /// The public cache is not populated; the first [`FileStorage::cache`]
    /// call does that.
    ///
    /// # Returns
    ///
    /// The public reference, `{prefix}{public_path}/{id}/{filename}`
    #[tracing::instrument(skip(self))]
    pub async fn store(&self, reference: &str, remove_original: bool) -> LarderResult<String> {
        let name = strip_mount_prefix(reference, self.config.prefix())?;
        let filename = match name.rsplit_once('/') {
            Some((_, filename)) if !filename.is_empty() => filename,
            _ => {
                return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                    "'{}' does not name a file",
                    reference
                )))
                .into());
            }
        };

        let path = resolve(self.config.web_root(), name)?;
        let contents = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(reference.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let id = self.backend.write_contents(&contents).await?;

        if remove_original {
            discard_file(&path).await;
            if let Some(parent) = path.parent() {
                discard_dir(parent).await;
            }
        }

        let public = format!(
            "{}{}/{}/{}",
            self.config.prefix(),
            self.config.public_path(),
            id,
            filename
        );

        tracing::info!(
            source = %reference,
            reference = %public,
            id = %id,
            size = contents.len(),
            "Stored file"
        );

        Ok(public)
    }

    /// Delete a stored file from the backend and drop its cache entry.
    ///
    /// The cache entry is only touched once the backend delete succeeded.
    /// Removing a reference whose content is already gone succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, reference: &str) -> LarderResult<()> {
        let name = parse_public(reference, &self.public_root)?;

        self.backend.remove_contents(name.id).await?;

        let path = self.cache_path(reference)?;
        discard_file(&path).await;
        if let Some(parent) = path.parent() {
            discard_dir(parent).await;
        }

        tracing::info!(reference = %reference, id = %name.id, "Removed file");
        Ok(())
    }

    /// Materialize the cache entry for a public reference.
    ///
    /// Reads the content from the backend, writes it to the cache path and
    /// returns it. Concurrent callers for the same reference all succeed;
    /// the last writer wins, which is harmless since content is immutable
    /// per identifier.
    ///
    /// # Errors
    ///
    /// `NotFound` when the backend has no content for the identifier.
    #[tracing::instrument(skip(self))]
    pub async fn cache(&self, reference: &str) -> LarderResult<Vec<u8>> {
        let name = parse_public(reference, &self.public_root)?;

        let contents = self
            .backend
            .read_contents(name.id)
            .await?
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(reference.to_string())))?;

        let path = self.cache_path(reference)?;
        write_cache_entry(&path, &contents).await;

        tracing::info!(reference = %reference, id = %name.id, size = contents.len(), "Cached file");
        Ok(contents)
    }

    /// Read an existing cache entry without touching the backend.
    ///
    /// An entry that exists but cannot be read counts as a miss.
    ///
    /// # Returns
    ///
    /// `Some(bytes)` on a cache hit, `None` when the entry must be rebuilt
    #[tracing::instrument(skip(self))]
    pub async fn read_cached(&self, reference: &str) -> LarderResult<Option<Vec<u8>>> {
        let path = self.cache_path(reference)?;

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                tracing::debug!(reference = %reference, size = contents.len(), "Cache hit");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable cache entry");
                Ok(None)
            }
        }
    }
}

/// Write a cache entry through a unique sibling temp file and rename it into place.
///
/// Failure is logged and otherwise ignored: the cache is derived data and
/// the caller already holds the bytes.
async fn write_cache_entry(path: &Path, contents: &[u8]) {
    let Some(dir) = path.parent() else {
        return;
    };

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(path = %dir.display(), error = %e, "Could not create cache directory");
        return;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{}.{}.tmp", file_name, generate_unique_name()));

    if let Err(e) = tokio::fs::write(&temp_path, contents).await {
        tracing::warn!(path = %temp_path.display(), error = %e, "Could not write cache entry");
        discard_file(&temp_path).await;
        return;
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        tracing::warn!(path = %path.display(), error = %e, "Could not move cache entry into place");
        discard_file(&temp_path).await;
    }
}

/// Attempt to delete a file, discarding any failure.
async fn discard_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %e, "Best-effort file removal failed");
    }
}

/// Attempt to delete a directory if it is empty, discarding any failure.
async fn discard_dir(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir(path).await {
        tracing::debug!(path = %path.display(), error = %e, "Best-effort directory removal failed");
    }
}
