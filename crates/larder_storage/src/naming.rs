//! Name generation and reference parsing.

use larder_error::{LarderResult, StorageError, StorageErrorKind, UploadError, UploadErrorKind};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a token that is unique across concurrent callers.
///
/// Microseconds since the epoch (14 hex digits) followed by 32 random bits
/// (8 hex digits).
pub fn generate_unique_name() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default();
    let suffix: u32 = rand::random();
    format!("{:014x}{:08x}", micros, suffix)
}

/// Generate a fresh staging directory reference under `tmp_path`.
///
/// The returned value has no prefix and no trailing slash, e.g.
/// `/upload/0623b1c2d3e4f5a1b2c3d4`.
pub fn generate_tmp_name(tmp_path: &str) -> String {
    format!("{}/{}", tmp_path, generate_unique_name())
}

/// Reduce an uploaded filename to a single safe path segment.
///
/// Browsers may send a full client path; only the final component is kept.
pub fn sanitize_filename(name: &str) -> LarderResult<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if !is_plain_segment(last) {
        return Err(UploadError::new(UploadErrorKind::InvalidFilename(name.to_string())).into());
    }

    Ok(last.to_string())
}

/// True when `segment` names a single entry: not empty, not `.` or `..`,
/// and free of separators and NUL.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// The two parts of a public reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicName<'a> {
    /// Backend identifier (the directory segment after the public root)
    pub id: &'a str,
    /// Original filename
    pub filename: &'a str,
}

/// Split a public reference into its identifier and filename.
///
/// `public_root` is the full namespace root including prefix and trailing
/// slash, see [`crate::namespace_root`].
pub fn parse_public<'a>(reference: &'a str, public_root: &str) -> LarderResult<PublicName<'a>> {
    let invalid = || -> larder_error::LarderError {
        StorageError::new(StorageErrorKind::InvalidPath(format!(
            "'{}' is not a public reference under '{}'",
            reference, public_root
        )))
        .into()
    };

    let rest = reference.strip_prefix(public_root).ok_or_else(invalid)?;
    let (id, filename) = rest.split_once('/').ok_or_else(invalid)?;

    if !is_plain_segment(id) || !is_plain_segment(filename) {
        return Err(invalid());
    }

    Ok(PublicName { id, filename })
}

/// Extract the backend identifier from a public reference.
///
/// The identifier is always the segment right after the public root, so
/// filenames containing dots never affect it.
///
/// ```
/// use larder_storage::name_to_id;
///
/// let id = name_to_id("/public/3f2a/my.file.v2.png", "/public/").unwrap();
/// assert_eq!(id, "3f2a");
/// ```
pub fn name_to_id(reference: &str, public_root: &str) -> LarderResult<String> {
    Ok(parse_public(reference, public_root)?.id.to_string())
}

/// Remove the mount prefix from a reference.
///
/// The prefix must end on a segment boundary: with prefix `/app`,
/// `/app/upload/x` strips to `/upload/x` but `/application/x` is rejected.
pub fn strip_mount_prefix<'a>(reference: &'a str, prefix: &str) -> LarderResult<&'a str> {
    match reference.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => Ok(rest),
        _ => Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
            "'{}' does not start with prefix '{}'",
            reference, prefix
        )))
        .into()),
    }
}

/// Join a prefix-free reference onto the web root.
///
/// Rejects references that would climb out of the web root.
pub fn resolve(web_root: &Path, reference: &str) -> LarderResult<PathBuf> {
    let mut path = web_root.to_path_buf();
    for component in Path::new(reference).components() {
        match component {
            Component::RootDir => {}
            Component::Normal(segment) => path.push(segment),
            _ => {
                return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                    "'{}' escapes the web root",
                    reference
                )))
                .into());
            }
        }
    }
    Ok(path)
}
