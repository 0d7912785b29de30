//! Document data types
//!
//! Documents are built by the ingestion side of the application and handed to
//! the persistence layer whole. Field names follow the camelCase JSON layout
//! already present in users' stored libraries.

use serde::{Deserialize, Serialize};

use crate::html::sanitize_html;

/// A stored document (an e-book being edited)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique, stable identifier
    pub id: String,
    /// Display title, never empty
    pub title: String,
    /// Author name
    #[serde(default)]
    pub author: String,
    /// Sections in reading order
    pub sections: Vec<Section>,
    /// Recoverable failures recorded while building the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_errors: Option<Vec<ProcessingError>>,
}

/// A section (chapter) of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Identifier, unique within the document
    pub id: String,
    /// Section title, may be empty
    #[serde(default)]
    pub title: String,
    /// Sanitized HTML body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Recoverable failures recorded while building the section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_errors: Option<Vec<ProcessingError>>,
}

/// Record of a recoverable failure, kept with the data it concerns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Document {
    /// Create an empty document
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: String::new(),
            sections: Vec::new(),
            processing_errors: None,
        }
    }

    /// Builder-style author setter
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Builder-style section append
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Look up a section by id
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Copy of this document with every section's content sanitized
    pub fn sanitized(&self) -> Self {
        Self {
            sections: self.sections.iter().map(Section::sanitized).collect(),
            ..self.clone()
        }
    }
}

impl Section {
    /// Create a section with HTML content
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: Some(content.into()),
            processing_errors: None,
        }
    }

    /// Copy of this section with its content sanitized
    pub fn sanitized(&self) -> Self {
        Self {
            content: self.content.as_deref().map(sanitize_html),
            ..self.clone()
        }
    }
}

impl ProcessingError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let doc = Document::new("b1", "T").with_section(Section::new("s1", "S", "<p>hi</p>"));
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "b1",
                "title": "T",
                "author": "",
                "sections": [{"id": "s1", "title": "S", "content": "<p>hi</p>"}]
            })
        );
    }

    #[test]
    fn test_processing_errors_round_trip() {
        let mut doc = Document::new("b1", "T");
        doc.processing_errors = Some(vec![
            ProcessingError::new("ENHANCE_TIMEOUT", "Enhancement timed out").with_details("chapter 3")
        ]);

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("processingErrors"));

        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_optional_fields_default() {
        let doc: Document = serde_json::from_str(
            r#"{"id":"b2","title":"T","sections":[{"id":"s1"}]}"#,
        )
        .unwrap();

        assert_eq!(doc.author, "");
        assert_eq!(doc.sections[0].title, "");
        assert_eq!(doc.sections[0].content, None);
    }

    #[test]
    fn test_sanitized_strips_scripts() {
        let doc = Document::new("b1", "T")
            .with_section(Section::new("s1", "S", "<p>ok</p><script>x()</script>"));

        let clean = doc.sanitized();
        assert_eq!(clean.sections[0].content.as_deref(), Some("<p>ok</p>"));
        assert_eq!(clean.id, doc.id);
        // Original untouched
        assert!(doc.sections[0].content.as_deref().unwrap().contains("script"));
    }
}
