//! Classification of references into the public and temporary namespaces.
//!
//! These are plain functions over strings. Callers pass the configured roots
//! explicitly, usually obtained from [`namespace_root`].

use std::collections::HashSet;

/// The two namespaces a reference can live in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum Namespace {
    /// Stored files, reachable through the retrieval endpoint
    #[display("public")]
    Public,
    /// Staged uploads waiting for their owning record to be saved
    #[display("temporary")]
    Temporary,
}

/// Build the string every reference in a namespace starts with.
///
/// ```
/// use larder_storage::namespace_root;
///
/// assert_eq!(namespace_root("", "/public"), "/public/");
/// assert_eq!(namespace_root("/app", "/upload"), "/app/upload/");
/// ```
pub fn namespace_root(prefix: &str, path: &str) -> String {
    format!("{}{}/", prefix, path)
}

/// Keep only the references under `root`, dropping repeats.
///
/// Order follows first occurrence in `files`.
pub fn filter_namespace<S: AsRef<str>>(files: &[S], root: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    files
        .iter()
        .map(|file| file.as_ref())
        .filter(|file| file.starts_with(root))
        .filter(|file| seen.insert(*file))
        .map(str::to_string)
        .collect()
}

/// Determine which namespace a reference belongs to, if any.
pub fn classify(reference: &str, public_root: &str, tmp_root: &str) -> Option<Namespace> {
    if reference.starts_with(public_root) {
        Some(Namespace::Public)
    } else if reference.starts_with(tmp_root) {
        Some(Namespace::Temporary)
    } else {
        None
    }
}
