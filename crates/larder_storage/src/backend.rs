//! Content backend trait and construction from configuration.

use crate::{BackendConfig, FileSystemContent, MemoryContent, RetryConfig, RetryingContent};
#[cfg(not(feature = "database"))]
use larder_error::ConfigError;
use larder_error::LarderResult;
use std::sync::Arc;

/// Trait for pluggable content backends.
///
/// A backend is the durable source of truth for uploaded bytes. The engine
/// never interprets the identifiers it hands out beyond using them as a
/// path segment in public references.
#[async_trait::async_trait]
pub trait ContentBackend: Send + Sync {
    /// Short backend name used in logs (e.g. "filesystem", "postgres").
    fn name(&self) -> &'static str;

    /// Persist `contents` and return a freshly assigned identifier.
    ///
    /// Implementations must never hand out the same identifier twice, even
    /// when called concurrently.
    ///
    /// # Arguments
    ///
    /// * `contents` - The raw bytes to persist
    ///
    /// # Returns
    ///
    /// The identifier under which the bytes can be read back
    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String>;

    /// Read the bytes last written under `id`.
    ///
    /// # Returns
    ///
    /// `Some(bytes)` if content exists, `None` if the identifier is unknown.
    /// `Err` is reserved for I/O faults and malformed identifiers.
    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>>;

    /// Delete the content stored under `id`.
    ///
    /// Deleting an identifier that does not exist succeeds.
    async fn remove_contents(&self, id: &str) -> LarderResult<()>;
}

/// Build the backend selected by `config`, wrapped in [`RetryingContent`]
/// when a retry policy is given.
///
/// # Errors
///
/// Returns an error if the backend cannot be initialized, or a configuration
/// error when `postgres` is selected without the `database` feature.
#[tracing::instrument(skip_all)]
pub fn build_backend(
    config: &BackendConfig,
    retry: Option<&RetryConfig>,
) -> LarderResult<Arc<dyn ContentBackend>> {
    match config {
        BackendConfig::Filesystem { path } => Ok(wrap(FileSystemContent::new(path)?, retry)),
        BackendConfig::Memory => Ok(wrap(MemoryContent::new(), retry)),
        #[cfg(feature = "database")]
        BackendConfig::Postgres {
            database_url,
            pool_size,
        } => Ok(wrap(
            crate::PostgresContent::connect(database_url.as_deref(), *pool_size)?,
            retry,
        )),
        #[cfg(not(feature = "database"))]
        BackendConfig::Postgres { .. } => Err(ConfigError::new(
            "postgres backend requires the 'database' feature",
        )
        .into()),
    }
}

fn wrap<B>(backend: B, retry: Option<&RetryConfig>) -> Arc<dyn ContentBackend>
where
    B: ContentBackend + 'static,
{
    match retry {
        Some(policy) => {
            tracing::info!(backend = backend.name(), ?policy, "Enabling backend retries");
            Arc::new(RetryingContent::new(backend, policy.clone()))
        }
        None => Arc::new(backend),
    }
}
