//! Library persistence facade
//!
//! Orchestrates probing, token bookkeeping, validation, sanitization and
//! fragmenting writes across the two backends. Every operation tries the
//! preferred backend first and makes exactly one fallback hop to the other;
//! there is no retry beyond that.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::document::{check_document, Document, LibraryEntry};
use crate::error::{BackendError, FragmentError, Result, SnapshotError, StoreError};
use crate::fragment::{FragmentCodec, FragmentWrite};
use crate::storage::{
    payload_size, probe, Backend, BackendKind, CapacityEstimator, DurableBackend, SessionBackend,
};
use crate::token::AccessTokenGuard;

use super::collection::Library;
use super::snapshot;

/// Result of loading the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Loaded documents, empty when no backend served any
    pub documents: Vec<Document>,
    /// Backend that served the documents
    pub source: Option<BackendKind>,
    /// Whether the non-preferred backend served the documents
    pub fallback_used: bool,
    /// Backends whose probe failed during this load
    pub unavailable: Vec<BackendKind>,
}

impl LoadOutcome {
    /// True when neither backend could even be probed successfully
    pub fn storage_unavailable(&self) -> bool {
        self.unavailable.len() == 2
    }
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Backend that accepted the write
    pub backend: BackendKind,
    /// Whether the non-preferred backend accepted the write
    pub fallback_used: bool,
    /// How the payload was laid out
    pub write: FragmentWrite,
    /// Number of documents persisted
    pub documents: usize,
}

/// Availability snapshot of one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    pub kind: BackendKind,
    pub available: bool,
    pub has_token: bool,
}

/// Why a single backend attempt failed
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("backend unavailable")]
    Unavailable,

    #[error("access token: {0}")]
    Token(BackendError),

    #[error("nothing stored")]
    Empty,

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Persistence facade over a durable and a session backend
pub struct LibraryStore {
    durable: Arc<dyn Backend>,
    session: Arc<dyn Backend>,
    storage_key: String,
    codec: FragmentCodec,
    capacity: CapacityEstimator,
    tokens: AccessTokenGuard,
}

impl LibraryStore {
    /// Create a store over two backends with default settings
    pub fn new(durable: Arc<dyn Backend>, session: Arc<dyn Backend>) -> Self {
        Self::with_config(&StoreConfig::default(), durable, session)
    }

    /// Create a store over two backends with explicit settings
    pub fn with_config(
        config: &StoreConfig,
        durable: Arc<dyn Backend>,
        session: Arc<dyn Backend>,
    ) -> Self {
        Self {
            durable,
            session,
            storage_key: config.storage.key.clone(),
            codec: FragmentCodec::new(config.fragments.threshold, config.fragments.chunk_size),
            capacity: CapacityEstimator::new(config.storage.capacity_ceiling),
            tokens: AccessTokenGuard::new(config.storage.token_key.clone()),
        }
    }

    /// Open the platform backends described by the configuration
    pub fn open(config: &StoreConfig) -> std::result::Result<Self, BackendError> {
        let durable = DurableBackend::with_quota(config.durable.path.clone(), config.durable.quota)?;
        let session = SessionBackend::with_quota(config.session.quota);
        tracing::info!(
            path = %config.durable.path.display(),
            key = %config.storage.key,
            "Opened library store"
        );
        Ok(Self::with_config(config, Arc::new(durable), Arc::new(session)))
    }

    /// Logical key the library is stored under
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Backend of the given kind
    pub fn backend(&self, kind: BackendKind) -> &dyn Backend {
        match kind {
            BackendKind::Durable => self.durable.as_ref(),
            BackendKind::Session => self.session.as_ref(),
        }
    }

    /// Whether a backend is currently usable
    pub fn probe(&self, kind: BackendKind) -> bool {
        probe(self.backend(kind))
    }

    /// Availability and token presence for both backends
    pub fn status(&self) -> [BackendStatus; 2] {
        [BackendKind::Durable, BackendKind::Session].map(|kind| {
            let available = self.probe(kind);
            let has_token = available
                && matches!(self.tokens.get_token(self.backend(kind)), Ok(Some(_)));
            BackendStatus {
                kind,
                available,
                has_token,
            }
        })
    }

    /// Load the library, preferring one backend and falling back to the other.
    ///
    /// Never fails: when neither backend serves a valid library the result
    /// is empty with no source. An empty result is ambiguous between a new
    /// user and two failed backends; `unavailable` narrows it down.
    pub fn get_library(&self, preferred: BackendKind) -> LoadOutcome {
        let mut unavailable = Vec::new();

        for kind in preferred.fallback_order() {
            match self.load_from(kind) {
                Ok(documents) => {
                    let fallback_used = kind != preferred;
                    if fallback_used {
                        tracing::warn!(
                            preferred = %preferred,
                            served_by = %kind,
                            count = documents.len(),
                            "Library loaded from fallback backend"
                        );
                    } else {
                        tracing::debug!(backend = %kind, count = documents.len(), "Library loaded");
                    }
                    return LoadOutcome {
                        documents,
                        source: Some(kind),
                        fallback_used,
                        unavailable,
                    };
                }
                Err(AttemptError::Unavailable) => {
                    tracing::warn!(backend = %kind, "Backend unavailable for load");
                    unavailable.push(kind);
                }
                Err(AttemptError::Empty) => {
                    tracing::debug!(backend = %kind, "No library stored");
                }
                Err(e) => {
                    tracing::warn!(backend = %kind, error = %e, "Failed to load library");
                }
            }
        }

        LoadOutcome {
            documents: Vec::new(),
            source: None,
            fallback_used: false,
            unavailable,
        }
    }

    /// Validate, sanitize and persist the library.
    ///
    /// Any stored document failing validation aborts the whole save before
    /// anything is written. When neither backend accepts the write the
    /// result is [`StoreError::StorageUnavailable`], which callers must
    /// surface to the user.
    pub fn save_library(&self, documents: &[Document], preferred: BackendKind) -> Result<SaveOutcome> {
        let prepared = prepare(documents)?;
        let payload = snapshot::encode(&prepared)?;
        let mut attempts = Vec::with_capacity(2);

        for kind in preferred.fallback_order() {
            attempts.push(kind);
            match self.write_to(kind, &payload) {
                Ok(write) => {
                    let fallback_used = kind != preferred;
                    if fallback_used {
                        tracing::warn!(
                            preferred = %preferred,
                            saved_to = %kind,
                            "Library saved to fallback backend"
                        );
                    } else {
                        tracing::debug!(
                            backend = %kind,
                            bytes = write.bytes(),
                            fragmented = write.is_fragmented(),
                            "Library saved"
                        );
                    }
                    return Ok(SaveOutcome {
                        backend: kind,
                        fallback_used,
                        write,
                        documents: prepared.len(),
                    });
                }
                Err(e) => {
                    tracing::warn!(backend = %kind, error = %e, "Failed to save library");
                }
            }
        }

        tracing::error!(count = prepared.len(), "Library could not be saved to any backend");
        Err(StoreError::StorageUnavailable { attempts })
    }

    /// Remove the stored library (direct slot, metadata and fragments) from
    /// one backend. The access token is left in place.
    pub fn clear(&self, kind: BackendKind) -> std::result::Result<usize, FragmentError> {
        let cleared = self.codec.clear(&self.storage_key, self.backend(kind))?;
        tracing::info!(backend = %kind, fragments = cleared, "Cleared stored library");
        Ok(cleared)
    }

    fn load_from(&self, kind: BackendKind) -> std::result::Result<Vec<Document>, AttemptError> {
        let backend = self.backend(kind);
        if !probe(backend) {
            return Err(AttemptError::Unavailable);
        }
        self.tokens
            .ensure_token(backend)
            .map_err(AttemptError::Token)?;

        let raw = self
            .codec
            .load(&self.storage_key, backend)?
            .ok_or(AttemptError::Empty)?;
        let documents = snapshot::decode(&raw)?;

        Ok(documents.iter().map(Document::sanitized).collect())
    }

    fn write_to(&self, kind: BackendKind, payload: &str) -> std::result::Result<FragmentWrite, AttemptError> {
        let backend = self.backend(kind);
        if !probe(backend) {
            return Err(AttemptError::Unavailable);
        }
        self.tokens
            .ensure_token(backend)
            .map_err(AttemptError::Token)?;

        // Advisory only; the codec decides fragmentation on its own
        if !self.capacity.has_enough_space(payload, backend) {
            tracing::warn!(
                backend = %kind,
                bytes = payload_size(payload),
                limit = self.capacity.limit_for(backend),
                "Payload exceeds capacity estimate, attempting write anyway"
            );
        }

        Ok(self.codec.save(&self.storage_key, payload, backend)?)
    }
}

/// Collapse duplicate ids, sanitize, and validate every stored document.
/// The built-in sample is exempt from validation.
fn prepare(documents: &[Document]) -> Result<Vec<Document>> {
    let entries: Vec<LibraryEntry> =
        Library::from_documents(documents.iter().map(Document::sanitized))
            .into_iter()
            .map(LibraryEntry::classify)
            .collect();

    for entry in &entries {
        if let LibraryEntry::Stored(doc) = entry {
            if let Err(e) = check_document(doc) {
                tracing::warn!(id = %doc.id, title = %doc.title, error = %e, "Rejecting library save");
                return Err(e.into());
            }
        }
    }

    Ok(entries.into_iter().map(LibraryEntry::into_document).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{sample_document, Section};
    use crate::error::ValidationRule;
    use crate::storage::MemoryBackend;

    fn setup() -> (LibraryStore, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let durable = Arc::new(MemoryBackend::new());
        let session = Arc::new(MemoryBackend::new());
        let store = LibraryStore::new(durable.clone(), session.clone());
        (store, durable, session)
    }

    fn book(id: &str, title: &str) -> Document {
        Document::new(id, title).with_section(Section::new("s1", "S", "<p>hi</p>"))
    }

    #[test]
    fn test_save_and_load_preferred() {
        let (store, durable, session) = setup();
        let docs = vec![book("b1", "T")];

        let outcome = store.save_library(&docs, BackendKind::Durable).unwrap();
        assert_eq!(outcome.backend, BackendKind::Durable);
        assert!(!outcome.fallback_used);
        assert!(!outcome.write.is_fragmented());
        assert!(durable.keys().contains(&"ebooks".to_string()));
        assert!(session.is_empty());

        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.documents, docs);
        assert_eq!(loaded.source, Some(BackendKind::Durable));
        assert!(!loaded.fallback_used);
    }

    #[test]
    fn test_save_falls_back_on_write_failure() {
        let (store, durable, session) = setup();
        durable.fail_writes(true);

        let outcome = store.save_library(&[book("b1", "T")], BackendKind::Durable).unwrap();
        assert_eq!(outcome.backend, BackendKind::Session);
        assert!(outcome.fallback_used);
        assert!(session.keys().contains(&"ebooks".to_string()));
    }

    #[test]
    fn test_save_both_failed() {
        let (store, durable, session) = setup();
        durable.set_available(false);
        session.set_available(false);

        let err = store.save_library(&[book("b1", "T")], BackendKind::Session).unwrap_err();
        match err {
            StoreError::StorageUnavailable { attempts } => {
                assert_eq!(attempts, vec![BackendKind::Session, BackendKind::Durable]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_both_failed_is_empty() {
        let (store, durable, session) = setup();
        durable.set_available(false);
        session.set_available(false);

        let loaded = store.get_library(BackendKind::Durable);
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.source, None);
        assert!(loaded.storage_unavailable());
    }

    #[test]
    fn test_load_empty_is_not_unavailable() {
        let (store, _, _) = setup();
        let loaded = store.get_library(BackendKind::Durable);

        assert!(loaded.documents.is_empty());
        assert!(!loaded.storage_unavailable());
    }

    #[test]
    fn test_validation_failure_aborts_save() {
        let (store, durable, session) = setup();
        let docs = vec![book("b1", "Good"), book("b2", "")];

        let err = store.save_library(&docs, BackendKind::Durable).unwrap_err();
        match err {
            StoreError::Validation(e) => {
                assert_eq!(e.id, "b2");
                assert_eq!(e.rule, ValidationRule::MissingTitle);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(durable.is_empty());
        assert!(session.is_empty());
    }

    #[test]
    fn test_built_in_sample_skips_validation() {
        let (store, _, _) = setup();
        let mut sample = sample_document();
        sample.sections.push(Section::new("", "draft", "<p>scratch</p>"));

        let outcome = store
            .save_library(&[sample, book("b1", "T")], BackendKind::Durable)
            .unwrap();
        assert_eq!(outcome.documents, 2);
    }

    #[test]
    fn test_edited_sample_reloads_with_library() {
        let (store, _, _) = setup();
        let mut sample = sample_document();
        sample.sections.push(Section::new("", "draft", "<p>scratch</p>"));
        let docs = vec![sample, book("b1", "T")];

        store.save_library(&docs, BackendKind::Durable).unwrap();

        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.source, Some(BackendKind::Durable));
        assert_eq!(loaded.documents, docs);
    }

    #[test]
    fn test_content_sanitized_on_save() {
        let (store, _, _) = setup();
        let doc = Document::new("b1", "T").with_section(Section::new(
            "s1",
            "S",
            "<p onclick=\"x()\">hi</p><script>steal()</script>",
        ));

        store.save_library(&[doc], BackendKind::Durable).unwrap();
        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.documents[0].sections[0].content.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_content_sanitized_on_load() {
        let (store, durable, _) = setup();
        durable
            .set_item(
                "ebooks",
                r#"[{"id":"b1","title":"T","sections":[{"id":"s1","title":"S","content":"<script>bad()</script><p>ok</p>"}]}]"#,
            )
            .unwrap();

        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.documents[0].sections[0].content.as_deref(), Some("<p>ok</p>"));
    }

    #[test]
    fn test_corrupt_preferred_falls_back() {
        let (store, durable, session) = setup();
        store.save_library(&[book("b1", "T")], BackendKind::Session).unwrap();
        durable.set_item("ebooks", "{ not json").unwrap();

        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.source, Some(BackendKind::Session));
        assert!(loaded.fallback_used);
        assert!(loaded.unavailable.is_empty());
        assert_eq!(session.keys().len(), 2);
    }

    #[test]
    fn test_tokens_issued_on_touch() {
        let (store, _, _) = setup();
        let before = store.status();
        assert!(before.iter().all(|s| s.available && !s.has_token));

        store.save_library(&[book("b1", "T")], BackendKind::Durable).unwrap();

        let after = store.status();
        assert!(after[0].has_token);
        assert!(!after[1].has_token);
    }

    #[test]
    fn test_duplicate_ids_collapse_on_save() {
        let (store, _, _) = setup();
        let outcome = store
            .save_library(&[book("b1", "old"), book("b1", "new")], BackendKind::Durable)
            .unwrap();
        assert_eq!(outcome.documents, 1);

        let loaded = store.get_library(BackendKind::Durable);
        assert_eq!(loaded.documents[0].title, "new");
    }

    #[test]
    fn test_clear() {
        let (store, durable, _) = setup();
        store.save_library(&[book("b1", "T")], BackendKind::Durable).unwrap();

        store.clear(BackendKind::Durable).unwrap();
        // Only the token remains
        assert_eq!(durable.keys(), vec!["folio_access_token".to_string()]);
        assert!(store.get_library(BackendKind::Durable).documents.is_empty());
    }
}
