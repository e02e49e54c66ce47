//! HTTP adapter for the larder storage engine.
//!
//! Exposes two endpoints over a [`FileStorage`]:
//!
//! - **Retrieval** (`GET {public_path}/*name`): rebuilds the cache entry for a
//!   public reference and returns its bytes. `?d=1` serves the file as a
//!   download instead of inline.
//! - **Upload** (`POST {tmp_path}`): stages the multipart file submitted
//!   under the configured field and answers `201 {"name": "<reference>"}`.
//!
//! # Example
//!
//! ```no_run
//! use larder_server::{AppState, create_router};
//! use larder_storage::{FileStorage, MemoryContent, ServerSettings, StorageConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileStorage::new(StorageConfig::default(), Arc::new(MemoryContent::new()))?;
//! let router = create_router(AppState::new(Arc::new(storage), ServerSettings::default()));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod error;

pub use api::{AppState, create_router};
pub use error::ApiError;

use larder_error::{LarderResult, ServerError, ServerErrorKind};
use larder_storage::{FileStorage, LarderConfig, build_backend};
use std::sync::Arc;

/// Build the application state described by `config`.
///
/// # Errors
///
/// Returns an error if the backend cannot be initialized or the namespace
/// layout is invalid.
pub fn build_state(config: &LarderConfig) -> LarderResult<AppState> {
    let backend = build_backend(config.backend(), config.retry().as_ref())?;
    let storage = FileStorage::new(config.storage().clone(), backend)?;
    Ok(AppState::new(Arc::new(storage), config.server().clone()))
}

/// Bind `addr` and serve `state` until Ctrl-C.
#[tracing::instrument(skip(state))]
pub async fn serve(state: AppState, addr: &str) -> LarderResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Bind(format!("{}: {}", addr, e))))?;

    tracing::info!(
        addr = %addr,
        public_root = %state.storage().public_root(),
        tmp_root = %state.storage().tmp_root(),
        "Listening"
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Serve(e.to_string())))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
