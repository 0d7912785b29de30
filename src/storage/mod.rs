//! Storage module for key-value backends
//!
//! Two independent facilities are supported: a durable backend that survives
//! restarts and a session backend cleared at the end of the session. Both are
//! size-limited and may fail independently, so nothing above this module
//! assumes either one is usable.

mod capacity;
mod durable;
mod memory;
mod probe;
mod session;

pub use capacity::{payload_size, CapacityEstimator, DEFAULT_CAPACITY_CEILING};
pub use durable::{DurableBackend, DEFAULT_DURABLE_QUOTA};
pub use memory::MemoryBackend;
pub use probe::{probe, PROBE_KEY, PROBE_VALUE};
pub use session::{SessionBackend, DEFAULT_SESSION_QUOTA};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Which of the two storage facilities an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Survives restarts
    Durable,
    /// Cleared at the end of the session
    Session,
}

impl BackendKind {
    /// The alternate backend used for fallback
    pub fn other(self) -> Self {
        match self {
            BackendKind::Durable => BackendKind::Session,
            BackendKind::Session => BackendKind::Durable,
        }
    }

    /// Preferred backend first, then its fallback
    pub fn fallback_order(self) -> [BackendKind; 2] {
        [self, self.other()]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Durable => f.write_str("durable"),
            BackendKind::Session => f.write_str("session"),
        }
    }
}

/// A string key-value store
///
/// All calls are synchronous and local. Implementations must be safe to share
/// across the tasks that run debounced saves.
pub trait Backend: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Delete a key; deleting an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<(), BackendError>;

    /// Static quota advertised by the backend, if known
    fn quota_hint(&self) -> Option<usize> {
        None
    }
}

/// Byte accounting shared by the in-process backends
///
/// Usage counts key and value bytes, mirroring how browser storage quotas
/// charge for both.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
