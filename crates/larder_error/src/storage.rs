//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create a directory under the web root or backend base
    #[display("Failed to create directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// No content exists for the reference or identifier
    #[display("File not found: {}", _0)]
    NotFound(String),
    /// Reference or identifier is malformed or escapes its namespace
    #[display("Invalid storage path: {}", _0)]
    InvalidPath(String),
    /// Stored content no longer matches its recorded digest
    #[display("Integrity check failed: {}", _0)]
    Integrity(String),
    /// Storage backend is unavailable
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
}

impl StorageErrorKind {
    /// Whether a backend operation failing with this kind may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageErrorKind::Unavailable(_))
    }
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use larder_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("/public/abc/pic.png".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
