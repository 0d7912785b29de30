//! Built-in sample document
//!
//! The application ships one read-only sample document. It is always
//! available, never read from storage, and exempt from validation when it
//! appears in a library being saved. Keeping it as a distinct
//! [`LibraryEntry`] variant means the facade never compares ids against the
//! reserved constant itself.

use super::types::{Document, Section};

/// Reserved id of the built-in sample document
pub const SAMPLE_DOCUMENT_ID: &str = "sample-book";

/// A document classified by where it comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEntry {
    /// The hard-coded sample shipped with the application
    BuiltIn(Document),
    /// A user document that lives in storage
    Stored(Document),
}

impl LibraryEntry {
    /// Classify a document by its id
    pub fn classify(document: Document) -> Self {
        if document.id == SAMPLE_DOCUMENT_ID {
            LibraryEntry::BuiltIn(document)
        } else {
            LibraryEntry::Stored(document)
        }
    }

    /// The built-in entry for a reserved id, if `id` names one
    pub fn built_in(id: &str) -> Option<Self> {
        (id == SAMPLE_DOCUMENT_ID).then(|| LibraryEntry::BuiltIn(sample_document()))
    }

    pub fn document(&self) -> &Document {
        match self {
            LibraryEntry::BuiltIn(doc) | LibraryEntry::Stored(doc) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            LibraryEntry::BuiltIn(doc) | LibraryEntry::Stored(doc) => doc,
        }
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self, LibraryEntry::BuiltIn(_))
    }
}

/// The sample document shipped with the application
pub fn sample_document() -> Document {
    Document::new(SAMPLE_DOCUMENT_ID, "Welcome to Folio")
        .with_author("The Folio Team")
        .with_section(Section::new(
            "sample-intro",
            "Getting Started",
            "<h1>Getting Started</h1>\
             <p>This sample book shows how chapters are laid out in the editor. \
             Open any chapter to edit its text, or import your own e-book.</p>",
        ))
        .with_section(Section::new(
            "sample-editing",
            "Editing Chapters",
            "<h1>Editing Chapters</h1>\
             <p>Changes are saved automatically a moment after you stop typing.</p>\
             <p>If storage fills up, your library moves to temporary storage \
             and a notice tells you so.</p>",
        ))
}
