//! Library persistence
//!
//! The versioned snapshot format, the in-memory collection, the dual-backend
//! persistence facade and the debounced document loader built on top of it.

mod collection;
mod loader;
pub mod snapshot;
mod store;

pub use collection::{Library, Upsert};
pub use loader::{DocumentLoader, StorageNotice};
pub use snapshot::SNAPSHOT_VERSION;
pub use store::{BackendStatus, LibraryStore, LoadOutcome, SaveOutcome};
