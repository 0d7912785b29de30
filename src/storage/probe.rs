//! Backend availability probe

use super::Backend;

/// Sentinel key written by the probe
pub const PROBE_KEY: &str = "__folio_storage_test__";

/// Sentinel value written by the probe
pub const PROBE_VALUE: &str = "__folio_storage_test__";

/// Check whether a backend is writable and readable right now.
///
/// Writes the sentinel, reads it back and deletes it. Returns true only when
/// the read-back value matches exactly; any backend error yields false.
pub fn probe(backend: &dyn Backend) -> bool {
    if let Err(e) = backend.set_item(PROBE_KEY, PROBE_VALUE) {
        tracing::debug!(error = %e, "Probe write failed");
        return false;
    }

    let read_back = match backend.get_item(PROBE_KEY) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Probe read failed");
            return false;
        }
    };

    if let Err(e) = backend.remove_item(PROBE_KEY) {
        tracing::debug!(error = %e, "Probe cleanup failed");
        return false;
    }

    read_back.as_deref() == Some(PROBE_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_probe_available() {
        let backend = MemoryBackend::new();
        assert!(probe(&backend));
        // Sentinel does not linger
        assert_eq!(backend.get_item(PROBE_KEY).unwrap(), None);
    }

    #[test]
    fn test_probe_unavailable() {
        let backend = MemoryBackend::new();
        backend.set_available(false);
        assert!(!probe(&backend));
    }

    #[test]
    fn test_probe_write_failure() {
        let backend = MemoryBackend::new();
        backend.fail_writes(true);
        assert!(!probe(&backend));
    }

    #[test]
    fn test_probe_is_repeatable() {
        let backend = MemoryBackend::new();
        for _ in 0..5 {
            assert!(probe(&backend));
        }
        assert_eq!(backend.len(), 0);
    }
}
