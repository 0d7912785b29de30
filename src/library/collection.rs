//! In-memory library collection
//!
//! Keeps documents in insertion order, keyed by id. Inserting a document
//! whose id is already present replaces it in place (last write wins).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{check_document_value, Document};
use crate::error::SnapshotError;

/// Ordered set of documents with unique ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Library {
    documents: Vec<Document>,
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced,
    Appended,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a sequence, collapsing duplicate ids (last wins)
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut library = Self::new();
        library.merge(documents);
        library
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the document with the same id, or append it
    pub fn upsert(&mut self, document: Document) -> Upsert {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => {
                *existing = document;
                Upsert::Replaced
            }
            None => {
                self.documents.push(document);
                Upsert::Appended
            }
        }
    }

    /// Remove a document by id, returning it
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let index = self.documents.iter().position(|d| d.id == id)?;
        Some(self.documents.remove(index))
    }

    /// Upsert every document in order; later documents win on id collision
    pub fn merge(&mut self, documents: impl IntoIterator<Item = Document>) -> usize {
        let mut replaced = 0;
        for document in documents {
            if self.upsert(document) == Upsert::Replaced {
                replaced += 1;
            }
        }
        replaced
    }

    /// Merge documents from untyped JSON (an array of documents).
    ///
    /// Every document is validated before any is merged, so an import either
    /// applies completely or not at all. Returns the number of documents
    /// imported.
    pub fn import_json(&mut self, raw: &str) -> Result<usize, SnapshotError> {
        let Value::Array(values) = serde_json::from_str::<Value>(raw)? else {
            return Err(SnapshotError::UnknownLayout);
        };

        let mut incoming = Vec::with_capacity(values.len());
        for value in values {
            check_document_value(&value)?;
            incoming.push(serde_json::from_value::<Document>(value)?);
        }

        let count = incoming.len();
        let replaced = self.merge(incoming);
        tracing::debug!(count, replaced, "Imported documents");
        Ok(count)
    }
}

impl From<Vec<Document>> for Library {
    fn from(documents: Vec<Document>) -> Self {
        Self::from_documents(documents)
    }
}

impl IntoIterator for Library {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}
