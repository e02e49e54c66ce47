//! Upload staging, durable persistence and lazy public caching.
//!
//! Uploaded files move through two namespaces under a web root:
//!
//! - **Temporary**: `{prefix}{tmp_path}/{token}/{filename}`, written by
//!   [`FileStorage::prepare`] straight from the upload intake
//! - **Public**: `{prefix}{public_path}/{id}/{filename}`, returned by
//!   [`FileStorage::store`] once the bytes live in a [`ContentBackend`]
//!
//! The public directory is only a cache. [`FileStorage::cache`] rebuilds an
//! entry from the backend on demand, so deleting it never loses data.
//!
//! Records that own several files use [`FileStorage::store_object`] and
//! [`FileStorage::remove_object`] to keep storage in step with their file
//! lists.
//!
//! # Backends
//!
//! - [`FileSystemContent`]: one file per blob
//! - [`MemoryContent`]: process-local map
//! - `PostgresContent`: blob column with digest verification (`database` feature)
//! - [`RetryingContent`]: exponential-backoff decorator for any of the above
//!
//! # Example
//!
//! ```rust
//! use larder_storage::{
//!     FileSet, FileStorage, MemoryContent, StorageConfigBuilder, StoredObject, UploadedFile, Uploads,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let web_root = tempfile::tempdir()?;
//! let config = StorageConfigBuilder::default()
//!     .web_root(web_root.path())
//!     .build()?;
//! let storage = FileStorage::new(config, Arc::new(MemoryContent::new()))?;
//!
//! let uploads: Uploads = [UploadedFile::new("avatar", "me.png", "image/png", b"PNG".to_vec())]
//!     .into_iter()
//!     .collect();
//!
//! let mut record = FileSet::new();
//! record.push(storage.prepare(&uploads, "avatar", None).await?);
//!
//! let report = storage.store_object(&mut record).await;
//! assert!(report.is_clean());
//! assert!(record.files()[0].starts_with("/public/"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod engine;
mod filesystem;
mod memory;
mod namespace;
mod naming;
#[cfg(feature = "database")]
mod postgres;
mod reconcile;
mod retry;
mod upload;

pub use backend::{ContentBackend, build_backend};
pub use config::{
    BackendConfig, LarderConfig, RetryConfig, RetryConfigBuilder, ServerSettings,
    ServerSettingsBuilder, StorageConfig, StorageConfigBuilder,
};
pub use engine::FileStorage;
pub use filesystem::FileSystemContent;
pub use memory::MemoryContent;
pub use namespace::{Namespace, classify, filter_namespace, namespace_root};
pub use naming::{
    PublicName, generate_tmp_name, generate_unique_name, name_to_id, parse_public, resolve,
    sanitize_filename, strip_mount_prefix,
};
#[cfg(feature = "database")]
pub use postgres::{PgPool, PostgresContent, create_pool, run_migrations, schema};
pub use reconcile::{FileSet, ReconcilePlan, ReconcileReport, StoredFiles, StoredObject};
pub use retry::RetryingContent;
pub use upload::{UploadSource, UploadedFile, Uploads};

pub use larder_error::{
    ConfigError, LarderError, LarderErrorKind, LarderResult, StorageError, StorageErrorKind,
    UploadError, UploadErrorKind,
};
