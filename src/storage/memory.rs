//! In-memory backend with fault injection
//!
//! Stands in for either storage facility in tests. Availability, read and
//! write failures can be toggled at runtime to exercise every fallback path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::BackendError;

use super::session::KeyValueMap;
use super::Backend;

/// In-memory backend with switchable failure modes
#[derive(Debug)]
pub struct MemoryBackend {
    map: RwLock<KeyValueMap>,
    available: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Writes left before every further write fails
    writes_remaining: AtomicUsize,
    /// Successful writes so far
    writes: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Unlimited backend with no faults
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Backend that rejects writes beyond `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota))
    }

    fn build(quota: Option<usize>) -> Self {
        Self {
            map: RwLock::new(KeyValueMap::new(quota)),
            available: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes_remaining: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every operation fail, as when the platform disables storage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make reads fail while writes still succeed
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes fail while reads still succeed
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Allow `count` more writes, then fail every write after that
    pub fn fail_writes_after(&self, count: usize) {
        self.writes_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.map.read().keys()
    }

    /// Number of successful writes, probe writes included
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Bytes currently stored
    pub fn usage(&self) -> usize {
        self.map.read().used()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("memory backend disabled".to_string()))
        }
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        self.check_available()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("writes disabled".to_string()));
        }
        let took = self
            .writes_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            });
        if took.is_err() {
            return Err(BackendError::Unavailable("write budget exhausted".to_string()));
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.check_available()?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.map.read().get(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        self.map.write().set(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        self.check_available()?;
        self.map.write().remove(key);
        Ok(())
    }

    fn quota_hint(&self) -> Option<usize> {
        self.map.read().quota()
    }
}
