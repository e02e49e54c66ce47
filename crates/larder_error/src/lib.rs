//! Error types for the larder storage engine.
//!
//! This crate provides the foundation error types shared by the storage engine
//! and its HTTP adapter.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use larder_error::{LarderResult, StorageError, StorageErrorKind};
//!
//! fn read_cached() -> LarderResult<Vec<u8>> {
//!     Err(StorageError::new(StorageErrorKind::NotFound("/public/abc/pic.png".into())))?
//! }
//!
//! let err = read_cached().unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod server;
mod storage;
mod upload;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{LarderError, LarderErrorKind, LarderResult};
pub use server::{ServerError, ServerErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use upload::{UploadError, UploadErrorKind};
