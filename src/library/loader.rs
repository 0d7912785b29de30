//! Document loader
//!
//! Hydrates a document by id for the editor and re-persists the library on
//! every mutation. High-frequency edits go through a debounced save that
//! coalesces rapid updates into a single write of the latest state.
//!
//! Updates are optimistic: a failed save raises a [`StorageNotice`] but the
//! in-memory library keeps the change. Nothing is rolled back.
//!
//! There is no coordination between independent writers to the same backend
//! (for example two application windows); the last writer wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::document::{Document, LibraryEntry};
use crate::error::{LoaderError, StoreError, ValidationError};
use crate::storage::BackendKind;

use super::collection::Library;
use super::store::{LibraryStore, LoadOutcome, SaveOutcome};

/// User-visible storage conditions raised by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageNotice {
    /// The preferred backend failed and the other one was used instead
    FallbackUsed {
        preferred: BackendKind,
        used: BackendKind,
    },
    /// Neither backend accepted the data; changes exist only in memory
    StorageUnavailable,
    /// A save was refused because a document failed validation
    Rejected(ValidationError),
}

/// Loads documents and persists edits through a [`LibraryStore`]
#[derive(Clone)]
pub struct DocumentLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    store: Arc<LibraryStore>,
    preferred: BackendKind,
    debounce: Duration,
    library: Mutex<Library>,
    /// Scheduled debounced save, if any
    pending: Mutex<Option<JoinHandle<()>>>,
    /// Bumped on every schedule or cancel; a firing save only runs if it
    /// still holds the latest generation
    generation: AtomicU64,
    notices: mpsc::UnboundedSender<StorageNotice>,
}

impl DocumentLoader {
    /// Create a loader and the receiving end of its notice channel
    pub fn new(
        store: Arc<LibraryStore>,
        preferred: BackendKind,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<StorageNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Self {
            inner: Arc::new(LoaderInner {
                store,
                preferred,
                debounce,
                library: Mutex::new(Library::new()),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                notices: tx,
            }),
        };
        (loader, rx)
    }

    /// Open a document by id.
    ///
    /// The built-in sample is returned without touching storage. Any other id
    /// reloads the library (after flushing a pending save) and is looked up
    /// once; a miss is reported as [`LoaderError::NotFound`].
    pub fn open(&self, id: &str) -> Result<LibraryEntry, LoaderError> {
        if let Some(entry) = LibraryEntry::built_in(id) {
            tracing::debug!(id = %id, "Opened built-in document");
            return Ok(entry);
        }

        self.flush();

        let outcome = self.inner.store.get_library(self.inner.preferred);
        self.inner.report_load(&outcome);

        let mut library = self.inner.library.lock();
        // Nothing served: keep unsaved in-memory edits rather than wiping them
        if outcome.source.is_some() {
            *library = Library::from(outcome.documents);
        }
        let found = library.get(id).cloned();
        drop(library);

        match found {
            Some(document) => Ok(LibraryEntry::Stored(document)),
            None => {
                tracing::warn!(id = %id, "Document not found in library");
                Err(LoaderError::NotFound(id.to_string()))
            }
        }
    }

    /// Current in-memory library
    pub fn documents(&self) -> Vec<Document> {
        self.inner.library.lock().documents().to_vec()
    }

    /// Current in-memory copy of one document
    pub fn get(&self, id: &str) -> Option<Document> {
        self.inner.library.lock().get(id).cloned()
    }

    /// Merge a document into the library and save immediately.
    ///
    /// Cancels any pending debounced save, since this write supersedes it.
    pub fn update(&self, document: Document) -> Result<SaveOutcome, StoreError> {
        self.inner.cancel_pending();
        self.inner.library.lock().upsert(document);
        self.inner.persist()
    }

    /// Merge a document into the library and save after the quiet interval.
    ///
    /// A further call within the interval cancels the scheduled save and
    /// starts the interval again. Must be called from within a tokio runtime.
    pub fn update_debounced(&self, document: Document) {
        self.inner.library.lock().upsert(document);
        self.schedule_save();
    }

    /// Remove a document from the library and save immediately
    pub fn remove(&self, id: &str) -> Result<SaveOutcome, LoaderError> {
        self.inner.cancel_pending();
        if self.inner.library.lock().remove(id).is_none() {
            return Err(LoaderError::NotFound(id.to_string()));
        }
        Ok(self.inner.persist()?)
    }

    /// Run a pending debounced save now. Returns `None` when nothing was pending.
    pub fn flush(&self) -> Option<Result<SaveOutcome, StoreError>> {
        let handle = self.inner.pending.lock().take()?;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let finished = handle.is_finished();
        handle.abort();
        if finished {
            return None;
        }

        tracing::debug!("Flushing pending save");
        Some(self.inner.persist())
    }

    /// Whether a debounced save is scheduled and has not yet run
    pub fn has_pending_save(&self) -> bool {
        self.inner
            .pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn schedule_save(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            inner.pending.lock().take();
            if let Err(e) = inner.persist() {
                tracing::debug!(error = %e, "Debounced save failed");
            }
        });

        if let Some(previous) = self.inner.pending.lock().replace(handle) {
            previous.abort();
            tracing::trace!("Rescheduled debounced save");
        }
    }
}

impl LoaderInner {
    fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Save the current in-memory library, raising notices for degraded
    /// outcomes. The in-memory state is kept whatever the result.
    fn persist(&self) -> Result<SaveOutcome, StoreError> {
        let documents = self.library.lock().documents().to_vec();

        match self.store.save_library(&documents, self.preferred) {
            Ok(outcome) => {
                if outcome.fallback_used {
                    self.notify(StorageNotice::FallbackUsed {
                        preferred: self.preferred,
                        used: outcome.backend,
                    });
                }
                Ok(outcome)
            }
            Err(e) => {
                match &e {
                    StoreError::Validation(invalid) => {
                        self.notify(StorageNotice::Rejected(invalid.clone()));
                    }
                    StoreError::StorageUnavailable { .. } | StoreError::Serialization(_) => {
                        tracing::error!(error = %e, "Save failed, keeping changes in memory only");
                        self.notify(StorageNotice::StorageUnavailable);
                    }
                }
                Err(e)
            }
        }
    }

    fn report_load(&self, outcome: &LoadOutcome) {
        if outcome.storage_unavailable() {
            self.notify(StorageNotice::StorageUnavailable);
        } else if let (true, Some(used)) = (outcome.fallback_used, outcome.source) {
            self.notify(StorageNotice::FallbackUsed {
                preferred: self.preferred,
                used,
            });
        }
    }

    fn notify(&self, notice: StorageNotice) {
        if self.notices.send(notice).is_err() {
            tracing::trace!("No listener for storage notices");
        }
    }
}
