//! Folio Store
//!
//! Client-side persistence for an e-book editor's document library.
//!
//! Features:
//! - Durable and session key-value backends with probing and one-hop fallback
//! - Fragmented writes for payloads too large for a single slot
//! - Structural validation and script stripping for stored documents
//! - Debounced saves for high-frequency edits

pub mod config;
pub mod document;
pub mod error;
pub mod fragment;
pub mod html;
pub mod library;
pub mod storage;
pub mod telemetry;
pub mod token;

pub use config::StoreConfig;
pub use document::{sample_document, validate_document, Document, LibraryEntry, Section};
pub use error::{LoaderError, Result, StoreError};
pub use html::sanitize_html;
pub use library::{DocumentLoader, Library, LibraryStore, LoadOutcome, SaveOutcome, StorageNotice};
pub use storage::{probe, Backend, BackendKind, DurableBackend, MemoryBackend, SessionBackend};
pub use token::AccessTokenGuard;
