//! Top-level error wrapper types.

#[cfg(feature = "database")]
use crate::{DatabaseError, DatabaseErrorKind};
use crate::{ConfigError, ServerError, StorageError, StorageErrorKind, UploadError};

/// Every failure the engine and its adapters can report.
///
/// # Examples
///
/// ```
/// use larder_error::{LarderError, UploadError, UploadErrorKind};
///
/// let upload_err = UploadError::new(UploadErrorKind::Missing("avatar".into()));
/// let err: LarderError = upload_err.into();
/// assert!(format!("{}", err).contains("Upload Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum LarderErrorKind {
    /// Storage or backend error
    #[from(StorageError)]
    Storage(StorageError),
    /// Upload validation error
    #[from(UploadError)]
    Upload(UploadError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database backend error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// HTTP adapter error
    #[from(ServerError)]
    Server(ServerError),
}

/// Larder error with kind discrimination.
///
/// # Examples
///
/// ```
/// use larder_error::{ConfigError, LarderResult};
///
/// fn might_fail() -> LarderResult<()> {
///     Err(ConfigError::new("tmp_path must start with '/'"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Larder Error: {}", _0)]
pub struct LarderError(Box<LarderErrorKind>);

impl LarderError {
    /// Create a new error from a kind.
    pub fn new(kind: LarderErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LarderErrorKind {
        &self.0
    }

    /// True when the error reports absent content rather than a fault.
    pub fn is_not_found(&self) -> bool {
        match self.kind() {
            LarderErrorKind::Storage(e) => matches!(e.kind, StorageErrorKind::NotFound(_)),
            #[cfg(feature = "database")]
            LarderErrorKind::Database(e) => e.kind == DatabaseErrorKind::NotFound,
            _ => false,
        }
    }

    /// True when a backend may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            LarderErrorKind::Storage(e) => e.kind.is_retryable(),
            #[cfg(feature = "database")]
            LarderErrorKind::Database(e) => {
                matches!(e.kind, DatabaseErrorKind::Connection(_))
            }
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to LarderErrorKind
impl<T> From<T> for LarderError
where
    T: Into<LarderErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for larder operations.
///
/// # Examples
///
/// ```
/// use larder_error::{LarderResult, StorageError, StorageErrorKind};
///
/// fn lookup() -> LarderResult<Vec<u8>> {
///     Err(StorageError::new(StorageErrorKind::Unavailable("disk offline".into())))?
/// }
///
/// assert!(lookup().unwrap_err().is_retryable());
/// ```
pub type LarderResult<T> = std::result::Result<T, LarderError>;
