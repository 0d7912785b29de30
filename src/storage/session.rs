//! Session-scoped in-process backend

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::BackendError;

use super::{entry_size, Backend};

/// Default quota for the session backend: 5 MiB
pub const DEFAULT_SESSION_QUOTA: usize = 5 * 1024 * 1024;

/// Key-value map with byte accounting against an optional quota
#[derive(Debug, Default)]
pub(crate) struct KeyValueMap {
    entries: HashMap<String, String>,
    used: usize,
    quota: Option<usize>,
}

impl KeyValueMap {
    pub(crate) fn new(quota: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            used: 0,
            quota,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let previous = self
            .entries
            .get(key)
            .map_or(0, |old| entry_size(key, old));
        let needed = entry_size(key, value);
        let base = self.used - previous;

        if let Some(quota) = self.quota {
            if base + needed > quota {
                return Err(BackendError::QuotaExceeded {
                    needed,
                    available: quota.saturating_sub(base),
                });
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        self.used = base + needed;
        Ok(())
    }

    pub(crate) fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.used -= entry_size(key, &old);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn quota(&self) -> Option<usize> {
        self.quota
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Backend whose contents live only as long as the session
///
/// Dropping the backend, or calling [`SessionBackend::end_session`], discards
/// everything stored in it.
#[derive(Debug)]
pub struct SessionBackend {
    map: RwLock<KeyValueMap>,
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend {
    /// Create a session backend with the default quota
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_SESSION_QUOTA)
    }

    /// Create a session backend with a custom quota in bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            map: RwLock::new(KeyValueMap::new(Some(quota))),
        }
    }

    /// Discard everything, as the platform does when a session ends
    pub fn end_session(&self) {
        let mut map = self.map.write();
        tracing::debug!(entries = map.len(), "Ending storage session");
        map.clear();
    }

    /// Bytes currently charged against the quota
    pub fn usage(&self) -> usize {
        self.map.read().used()
    }
}

impl Backend for SessionBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.map.read().get(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.map.write().set(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        self.map.write().remove(key);
        Ok(())
    }

    fn quota_hint(&self) -> Option<usize> {
        self.map.read().quota()
    }
}
