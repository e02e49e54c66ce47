//! Upload validation error types.

/// Reasons an upload is rejected before anything touches disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UploadErrorKind {
    /// No upload was submitted under the form field
    #[display("No upload under field '{}'", _0)]
    Missing(String),
    /// Declared MIME type is outside the allowed set
    #[display("Type '{}' not allowed (allowed: {})", content_type, allowed)]
    TypeNotAllowed {
        /// Declared MIME type, lowercased
        content_type: String,
        /// Comma-separated allowed types
        allowed: String,
    },
    /// Declared filename cannot be used as a path segment
    #[display("Invalid filename: '{}'", _0)]
    InvalidFilename(String),
}

/// Upload validation error with location tracking.
///
/// # Examples
///
/// ```
/// use larder_error::{UploadError, UploadErrorKind};
///
/// let err = UploadError::new(UploadErrorKind::Missing("avatar".to_string()));
/// assert!(format!("{}", err).contains("avatar"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upload Error: {} at line {} in {}", kind, line, file)]
pub struct UploadError {
    /// The kind of error that occurred
    pub kind: UploadErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UploadError {
    /// Create a new upload error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UploadErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
