//! Payload capacity estimation

use super::Backend;

/// Conservative ceiling under typical 5-10 MiB backend quotas: 4 MiB
pub const DEFAULT_CAPACITY_CEILING: usize = 4 * 1024 * 1024;

/// UTF-8 encoded size of a payload in bytes
pub fn payload_size(payload: &str) -> usize {
    payload.len()
}

/// Decides whether a payload comfortably fits a backend
#[derive(Debug, Clone, Copy)]
pub struct CapacityEstimator {
    ceiling: usize,
}

impl Default for CapacityEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_CEILING)
    }
}

impl CapacityEstimator {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    /// Effective limit for a backend: the ceiling, or the backend's own
    /// quota hint when that is smaller
    pub fn limit_for(&self, backend: &dyn Backend) -> usize {
        backend
            .quota_hint()
            .map_or(self.ceiling, |quota| quota.min(self.ceiling))
    }

    /// Whether the payload fits under the effective limit. Pure, no I/O.
    pub fn has_enough_space(&self, payload: &str, backend: &dyn Backend) -> bool {
        payload_size(payload) <= self.limit_for(backend)
    }
}
