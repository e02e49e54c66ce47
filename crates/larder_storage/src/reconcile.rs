//! Reconciling an owning record's file lists against storage.
//!
//! A record knows the files it had when last saved ("old files") and the
//! files it holds now ("current files", possibly including staged uploads).
//! Saving the record stores the staged ones and removes the public ones that
//! disappeared; deleting the record removes every public file it ever
//! referenced.

use crate::{FileStorage, filter_namespace};
use derive_getters::Getters;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Staged reference → public reference, `None` where storing failed.
pub type StoredFiles = BTreeMap<String, Option<String>>;

/// A record that owns a collection of file references.
pub trait StoredObject {
    /// References as of the last save.
    fn old_files(&self) -> Vec<String>;

    /// References currently held.
    fn files(&self) -> Vec<String>;

    /// Receive the outcome of storing the staged references.
    fn set_files(&mut self, stored: StoredFiles);
}

/// Which references a reconciliation pass will touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct ReconcilePlan {
    /// Public references to delete from storage
    to_remove: Vec<String>,
    /// Staged references to persist
    to_store: Vec<String>,
}

impl ReconcilePlan {
    /// Plan the save of a record.
    ///
    /// Public references present in both lists are left alone.
    pub fn for_store<S: AsRef<str>>(
        old: &[S],
        current: &[S],
        public_root: &str,
        tmp_root: &str,
    ) -> Self {
        let current_public: HashSet<String> =
            filter_namespace(current, public_root).into_iter().collect();

        let to_remove = filter_namespace(old, public_root)
            .into_iter()
            .filter(|file| !current_public.contains(file))
            .collect();

        Self {
            to_remove,
            to_store: filter_namespace(current, tmp_root),
        }
    }

    /// Plan the deletion of a record: every public reference in either list.
    pub fn for_remove<S: AsRef<str>>(old: &[S], current: &[S], public_root: &str) -> Self {
        let all: Vec<&str> = old.iter().chain(current).map(|f| f.as_ref()).collect();

        Self {
            to_remove: filter_namespace(&all, public_root),
            to_store: Vec::new(),
        }
    }

    /// True when the pass has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_store.is_empty()
    }
}

/// Outcome of a reconciliation pass.
///
/// Individual failures never abort a pass; they are collected in `failed`
/// so the caller can decide whether the record save should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct ReconcileReport {
    /// Mapping applied to the record via [`StoredObject::set_files`]
    stored: StoredFiles,
    /// Public references deleted from storage
    removed: Vec<String>,
    /// Public references whose cache entry was materialized
    cached: Vec<String>,
    /// References whose operation failed
    failed: Vec<String>,
}

impl ReconcileReport {
    /// True when every operation in the pass succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FileStorage {
    /// Store newly staged files and remove files the record dropped.
    ///
    /// Performs one backend write per staged reference and one backend
    /// delete per removed public reference; unchanged references cause no
    /// I/O. The resulting mapping is handed to [`StoredObject::set_files`].
    #[tracing::instrument(skip_all)]
    pub async fn store_object<O>(&self, object: &mut O) -> ReconcileReport
    where
        O: StoredObject + ?Sized,
    {
        let plan = ReconcilePlan::for_store(
            &object.old_files(),
            &object.files(),
            self.public_root(),
            self.tmp_root(),
        );

        let mut report = ReconcileReport::default();
        self.remove_planned(&plan, &mut report).await;

        for file in plan.to_store() {
            match self.store(file, true).await {
                Ok(public) => {
                    report.stored.insert(file.clone(), Some(public));
                }
                Err(e) => {
                    warn!(reference = %file, error = %e, "Failed to store staged file");
                    report.stored.insert(file.clone(), None);
                    report.failed.push(file.clone());
                }
            }
        }

        object.set_files(report.stored.clone());

        tracing::info!(
            stored = report.stored.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Reconciled record files"
        );
        report
    }

    /// Remove every public file the record references, old or current.
    #[tracing::instrument(skip_all)]
    pub async fn remove_object<O>(&self, object: &O) -> ReconcileReport
    where
        O: StoredObject + ?Sized,
    {
        let plan = ReconcilePlan::for_remove(
            &object.old_files(),
            &object.files(),
            self.public_root(),
        );

        let mut report = ReconcileReport::default();
        self.remove_planned(&plan, &mut report).await;

        tracing::info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Removed record files"
        );
        report
    }

    /// Materialize the cache entry of every current public file.
    ///
    /// Staged references have no backend content yet and are skipped.
    #[tracing::instrument(skip_all)]
    pub async fn cache_object<O>(&self, object: &O) -> ReconcileReport
    where
        O: StoredObject + ?Sized,
    {
        let mut report = ReconcileReport::default();

        for file in filter_namespace(&object.files(), self.public_root()) {
            match self.cache(&file).await {
                Ok(_) => report.cached.push(file),
                Err(e) => {
                    warn!(reference = %file, error = %e, "Failed to cache file");
                    report.failed.push(file);
                }
            }
        }

        report
    }

    async fn remove_planned(&self, plan: &ReconcilePlan, report: &mut ReconcileReport) {
        for file in plan.to_remove() {
            match self.remove(file).await {
                Ok(()) => report.removed.push(file.clone()),
                Err(e) => {
                    warn!(reference = %file, error = %e, "Failed to remove file");
                    report.failed.push(file.clone());
                }
            }
        }
    }
}

/// Minimal [`StoredObject`]: an old and a current list of references.
///
/// [`StoredObject::set_files`] swaps staged references for their public
/// counterparts and commits the current list as the new old list. Staged
/// references that failed to store are kept so a later save can retry them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct FileSet {
    /// References as of the last save
    old: Vec<String>,
    /// References currently held
    current: Vec<String>,
}

impl FileSet {
    /// A record with no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// A record whose current files are already persisted.
    pub fn persisted(files: Vec<String>) -> Self {
        Self {
            old: files.clone(),
            current: files,
        }
    }

    /// Attach a reference.
    pub fn push(&mut self, reference: impl Into<String>) {
        self.current.push(reference.into());
    }

    /// Detach a reference. Returns whether it was attached.
    pub fn detach(&mut self, reference: &str) -> bool {
        let before = self.current.len();
        self.current.retain(|file| file != reference);
        before != self.current.len()
    }
}

impl StoredObject for FileSet {
    fn old_files(&self) -> Vec<String> {
        self.old.clone()
    }

    fn files(&self) -> Vec<String> {
        self.current.clone()
    }

    fn set_files(&mut self, stored: StoredFiles) {
        for file in &mut self.current {
            if let Some(Some(public)) = stored.get(file.as_str()) {
                *file = public.clone();
            }
        }
        self.old = self.current.clone();
    }
}
