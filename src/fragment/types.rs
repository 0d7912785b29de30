//! Fragment set types

use serde::{Deserialize, Serialize};

/// Default size above which a payload is fragmented: 2 MiB
pub const DEFAULT_FRAGMENT_THRESHOLD: usize = 2 * 1024 * 1024;

/// Default number of code points per fragment: 1 Mi
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Metadata record written under `<key>_metadata`
///
/// Its presence marks the direct `<key>` slot as non-authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    /// Number of fragments, indexed `0..total_fragments`
    pub total_fragments: usize,
    /// Write time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// SHA-256 of the reassembled payload, hex-encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// How a payload ended up on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentWrite {
    /// Written whole under the direct key
    Direct { bytes: usize },
    /// Split across indexed fragment keys
    Fragmented { total_fragments: usize, bytes: usize },
}

impl FragmentWrite {
    pub fn is_fragmented(&self) -> bool {
        matches!(self, FragmentWrite::Fragmented { .. })
    }

    pub fn bytes(&self) -> usize {
        match self {
            FragmentWrite::Direct { bytes } | FragmentWrite::Fragmented { bytes, .. } => *bytes,
        }
    }
}

/// Key holding the metadata record for `key`
pub fn metadata_key(key: &str) -> String {
    format!("{}_metadata", key)
}

/// Key holding fragment `index` of `key`
pub fn fragment_key(key: &str, index: usize) -> String {
    format!("{}_fragment_{}", key, index)
}
