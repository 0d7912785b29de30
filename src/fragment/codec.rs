//! Fragmenting writer and reassembling reader

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::{BackendError, FragmentError};
use crate::storage::{payload_size, Backend};

use super::types::{
    fragment_key, metadata_key, FragmentMetadata, FragmentWrite, DEFAULT_CHUNK_SIZE,
    DEFAULT_FRAGMENT_THRESHOLD,
};

/// Writes and reads possibly-fragmented string payloads
#[derive(Debug, Clone, Copy)]
pub struct FragmentCodec {
    /// Payloads of at least this many bytes are fragmented
    threshold: usize,
    /// Code points per fragment
    chunk_size: usize,
}

impl Default for FragmentCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_THRESHOLD, DEFAULT_CHUNK_SIZE)
    }
}

impl FragmentCodec {
    pub fn new(threshold: usize, chunk_size: usize) -> Self {
        Self {
            threshold,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Store `data` under `key`, fragmenting when it reaches the threshold.
    ///
    /// Any stale fragment set for `key` is cleared first. On a write error the
    /// partially written fragments are left behind and no metadata record
    /// points at them; the caller should treat the backend as failed.
    pub fn save(
        &self,
        key: &str,
        data: &str,
        backend: &dyn Backend,
    ) -> Result<FragmentWrite, FragmentError> {
        let cleared = clear_fragments(key, backend)?;
        backend.remove_item(&metadata_key(key))?;
        if cleared > 0 {
            tracing::debug!(key = %key, cleared, "Cleared stale fragments");
        }

        let bytes = payload_size(data);
        if bytes < self.threshold {
            backend.set_item(key, data)?;
            tracing::debug!(key = %key, bytes, "Stored payload directly");
            return Ok(FragmentWrite::Direct { bytes });
        }

        let chunks = split_code_points(data, self.chunk_size);
        for (index, chunk) in chunks.iter().enumerate() {
            backend.set_item(&fragment_key(key, index), chunk)?;
        }

        // Metadata goes last: until it exists the fragment set is invisible
        let metadata = FragmentMetadata {
            total_fragments: chunks.len(),
            timestamp: Utc::now().timestamp_millis(),
            checksum: Some(checksum(data)),
        };
        let encoded = serde_json::to_string(&metadata).map_err(|e| {
            FragmentError::CorruptMetadata {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        backend.set_item(&metadata_key(key), &encoded)?;
        backend.remove_item(key)?;

        tracing::debug!(
            key = %key,
            bytes,
            fragments = chunks.len(),
            "Stored payload as fragments"
        );

        Ok(FragmentWrite::Fragmented {
            total_fragments: chunks.len(),
            bytes,
        })
    }

    /// Read the payload stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored. A fragment set with any gap,
    /// unreadable metadata or a checksum mismatch is an error, never a
    /// truncated payload.
    pub fn load(&self, key: &str, backend: &dyn Backend) -> Result<Option<String>, FragmentError> {
        let Some(raw) = backend.get_item(&metadata_key(key))? else {
            return Ok(backend.get_item(key)?);
        };

        let metadata: FragmentMetadata =
            serde_json::from_str(&raw).map_err(|e| FragmentError::CorruptMetadata {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if metadata.total_fragments == 0 {
            return Err(FragmentError::CorruptMetadata {
                key: key.to_string(),
                reason: "zero fragments".to_string(),
            });
        }

        let mut data = String::new();
        for index in 0..metadata.total_fragments {
            match backend.get_item(&fragment_key(key, index))? {
                Some(chunk) => data.push_str(&chunk),
                None => {
                    return Err(FragmentError::MissingFragment {
                        key: key.to_string(),
                        index,
                        total: metadata.total_fragments,
                    })
                }
            }
        }

        if let Some(expected) = metadata.checksum {
            let actual = checksum(&data);
            if actual != expected {
                return Err(FragmentError::ChecksumMismatch {
                    key: key.to_string(),
                    expected,
                    actual,
                });
            }
        }

        tracing::debug!(
            key = %key,
            fragments = metadata.total_fragments,
            "Reassembled fragmented payload"
        );

        Ok(Some(data))
    }

    /// Remove the direct slot, the metadata record and every fragment of `key`
    pub fn clear(&self, key: &str, backend: &dyn Backend) -> Result<usize, FragmentError> {
        let cleared = clear_fragments(key, backend)?;
        backend.remove_item(&metadata_key(key))?;
        backend.remove_item(key)?;
        Ok(cleared)
    }
}

/// Remove fragments in ascending index order until one is absent
fn clear_fragments(key: &str, backend: &dyn Backend) -> Result<usize, BackendError> {
    let mut index = 0;
    loop {
        let fragment = fragment_key(key, index);
        if backend.get_item(&fragment)?.is_none() {
            return Ok(index);
        }
        backend.remove_item(&fragment)?;
        index += 1;
    }
}

/// Split `data` into chunks of at most `chunk_size` code points.
///
/// Chunk boundaries always fall between characters, so no multi-byte
/// character is ever split.
pub fn split_code_points(data: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in data.char_indices() {
        if count == chunk_size {
            chunks.push(&data[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < data.len() {
        chunks.push(&data[start..]);
    }

    chunks
}

fn checksum(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn small_codec() -> FragmentCodec {
        FragmentCodec::new(16, 4)
    }

    #[test]
    fn test_split_ascii() {
        assert_eq!(split_code_points("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(split_code_points("abcdefgh", 4), vec!["abcd", "efgh"]);
        assert!(split_code_points("", 4).is_empty());
    }

    #[test]
    fn test_split_never_breaks_multibyte() {
        let data = "añ日本語🎉é";
        let chunks = split_code_points(data, 2);

        assert_eq!(chunks, vec!["añ", "日本", "語🎉", "é"]);
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn test_direct_round_trip() {
        let backend = MemoryBackend::new();
        let codec = small_codec();

        let write = codec.save("lib", "short", &backend).unwrap();
        assert_eq!(write, FragmentWrite::Direct { bytes: 5 });
        assert_eq!(backend.keys(), vec!["lib".to_string()]);
        assert_eq!(codec.load("lib", &backend).unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn test_fragmented_round_trip() {
        let backend = MemoryBackend::new();
        let codec = small_codec();
        let data = "0123456789abcdefghij";

        let write = codec.save("lib", data, &backend).unwrap();
        assert_eq!(
            write,
            FragmentWrite::Fragmented {
                total_fragments: 5,
                bytes: 20
            }
        );
        assert_eq!(backend.get_item("lib").unwrap(), None);
        assert_eq!(codec.load("lib", &backend).unwrap().as_deref(), Some(data));
    }

    #[test]
    fn test_fragmented_multibyte_round_trip() {
        let backend = MemoryBackend::new();
        let codec = small_codec();
        let data = "日本語のテキストと絵文字🎉🎉🎉";

        let write = codec.save("lib", data, &backend).unwrap();
        assert!(write.is_fragmented());
        assert_eq!(codec.load("lib", &backend).unwrap().as_deref(), Some(data));
    }

    #[test]
    fn test_missing_fragment_is_hard_failure() {
        let codec = small_codec();
        let data = "0123456789abcdefghij";

        for missing in 0..5 {
            let backend = MemoryBackend::new();
            codec.save("lib", data, &backend).unwrap();
            backend.remove_item(&fragment_key("lib", missing)).unwrap();

            let err = codec.load("lib", &backend).unwrap_err();
            assert!(matches!(
                err,
                FragmentError::MissingFragment { index, total: 5, .. } if index == missing
            ));
        }
    }

    #[test]
    fn test_tampered_fragment_fails_checksum() {
        let backend = MemoryBackend::new();
        let codec = small_codec();
        codec.save("lib", "0123456789abcdefghij", &backend).unwrap();
        backend.set_item(&fragment_key("lib", 1), "XXXX").unwrap();

        let err = codec.load("lib", &backend).unwrap_err();
        assert!(matches!(err, FragmentError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_corrupt_metadata() {
        let backend = MemoryBackend::new();
        backend.set_item("lib", "direct").unwrap();
        backend.set_item(&metadata_key("lib"), "not json").unwrap();

        let err = small_codec().load("lib", &backend).unwrap_err();
        assert!(matches!(err, FragmentError::CorruptMetadata { .. }));
    }

    #[test]
    fn test_direct_save_clears_previous_fragments() {
        let backend = MemoryBackend::new();
        let codec = small_codec();

        codec.save("lib", "0123456789abcdefghij", &backend).unwrap();
        codec.save("lib", "tiny", &backend).unwrap();

        assert_eq!(backend.keys(), vec!["lib".to_string()]);
        assert_eq!(codec.load("lib", &backend).unwrap().as_deref(), Some("tiny"));
    }

    #[test]
    fn test_shorter_fragment_set_replaces_longer() {
        let backend = MemoryBackend::new();
        let codec = small_codec();

        codec.save("lib", &"x".repeat(40), &backend).unwrap();
        codec.save("lib", &"y".repeat(17), &backend).unwrap();

        assert_eq!(backend.get_item(&fragment_key("lib", 5)).unwrap(), None);
        assert_eq!(
            codec.load("lib", &backend).unwrap(),
            Some("y".repeat(17))
        );
    }

    #[test]
    fn test_failed_write_leaves_no_metadata() {
        let backend = MemoryBackend::new();
        let codec = small_codec();
        backend.fail_writes_after(2);

        let err = codec.save("lib", "0123456789abcdefghij", &backend).unwrap_err();
        assert!(matches!(err, FragmentError::Backend(_)));
        assert_eq!(backend.get_item(&metadata_key("lib")).unwrap(), None);
    }

    #[test]
    fn test_load_absent_key() {
        let backend = MemoryBackend::new();
        assert_eq!(small_codec().load("lib", &backend).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let backend = MemoryBackend::new();
        let codec = small_codec();
        codec.save("lib", "0123456789abcdefghij", &backend).unwrap();

        assert_eq!(codec.clear("lib", &backend).unwrap(), 5);
        assert!(backend.is_empty());
    }
}
