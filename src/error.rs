//! Error types for the Folio persistence layer

use thiserror::Error;

use crate::storage::BackendKind;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence facade error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every backend was tried and none accepted the write.
    #[error("Storage unavailable: tried {}", format_attempts(.attempts))]
    StorageUnavailable { attempts: Vec<BackendKind> },
}

impl StoreError {
    /// Whether this is the terminal both-backends-failed condition
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable { .. })
    }
}

fn format_attempts(attempts: &[BackendKind]) -> String {
    attempts
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Backend-specific errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Fragment codec errors
#[derive(Error, Debug)]
pub enum FragmentError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Fragment {index} of {total} missing for key {key}")]
    MissingFragment {
        key: String,
        index: usize,
        total: usize,
    },

    #[error("Corrupt fragment metadata for key {key}: {reason}")]
    CorruptMetadata { key: String, reason: String },

    #[error("Checksum mismatch for key {key}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        key: String,
        expected: String,
        actual: String,
    },
}

/// Errors decoding a stored library snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    #[error("Snapshot is neither a versioned envelope nor a document array")]
    UnknownLayout,

    #[error("Stored {0}")]
    Invalid(#[from] ValidationError),
}

/// Structural validation failure for a single document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document \"{title}\" ({id}): {rule}")]
pub struct ValidationError {
    /// Title of the offending document (may be empty when the title is the problem)
    pub title: String,
    /// Id of the offending document
    pub id: String,
    /// Which structural rule was violated
    pub rule: ValidationRule,
}

/// Structural rules checked before persisting a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    #[error("missing or empty id")]
    MissingId,

    #[error("missing or empty title")]
    MissingTitle,

    #[error("sections is not a sequence")]
    SectionsNotSequence,

    #[error("section {index} has a missing or empty id")]
    SectionMissingId { index: usize },

    #[error("section {index} title is not a string")]
    SectionTitleNotString { index: usize },

    #[error("section {index} content is not a string")]
    SectionContentNotString { index: usize },

    #[error("document is not an object")]
    NotAnObject,
}

/// Document loader errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
