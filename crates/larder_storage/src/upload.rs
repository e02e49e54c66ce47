//! Uploaded files as handed over by the host's upload intake.

use std::collections::HashMap;

/// One file submitted under a form field.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_new::new)]
pub struct UploadedFile {
    /// Form field the file was submitted under
    #[new(into)]
    field: String,
    /// Filename as declared by the client
    #[new(into)]
    filename: String,
    /// MIME type as declared by the client
    #[new(into)]
    content_type: String,
    /// Raw file contents
    #[new(into)]
    contents: Vec<u8>,
}

/// Source of uploaded files, keyed by form field name.
///
/// Hosts implement this over whatever their multipart layer produces.
pub trait UploadSource {
    /// The upload submitted under `field`, if any.
    fn upload(&self, field: &str) -> Option<&UploadedFile>;
}

/// Map-backed [`UploadSource`].
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    files: HashMap<String, UploadedFile>,
}

impl Uploads {
    /// Create an empty set of uploads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any earlier upload under the same field.
    pub fn insert(&mut self, file: UploadedFile) {
        self.files.insert(file.field.clone(), file);
    }

    /// Number of uploaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when nothing was uploaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<UploadedFile> for Uploads {
    fn from_iter<I: IntoIterator<Item = UploadedFile>>(iter: I) -> Self {
        let mut uploads = Self::new();
        for file in iter {
            uploads.insert(file);
        }
        uploads
    }
}

impl UploadSource for Uploads {
    fn upload(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }
}
