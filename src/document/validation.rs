//! Structural validation of documents
//!
//! Typed [`Document`]s already guarantee field types through serde, so the
//! typed check only enforces non-empty identifiers and titles. Untyped JSON
//! (imports, legacy payloads) goes through [`check_document_value`], which
//! also checks the types serde would otherwise coerce or reject wholesale.

use serde_json::Value;

use crate::error::{ValidationError, ValidationRule};

use super::types::Document;

/// Whether a document satisfies the structural rules
pub fn validate_document(doc: &Document) -> bool {
    check_document(doc).is_ok()
}

/// Check a typed document, reporting the first violated rule
pub fn check_document(doc: &Document) -> Result<(), ValidationError> {
    let fail = |rule| ValidationError {
        title: doc.title.clone(),
        id: doc.id.clone(),
        rule,
    };

    if doc.id.is_empty() {
        return Err(fail(ValidationRule::MissingId));
    }
    if doc.title.is_empty() {
        return Err(fail(ValidationRule::MissingTitle));
    }

    for (index, section) in doc.sections.iter().enumerate() {
        if section.id.is_empty() {
            return Err(fail(ValidationRule::SectionMissingId { index }));
        }
    }

    Ok(())
}

/// Check an untyped JSON document, reporting the first violated rule
pub fn check_document_value(value: &Value) -> Result<(), ValidationError> {
    let Some(obj) = value.as_object() else {
        return Err(ValidationError {
            title: String::new(),
            id: String::new(),
            rule: ValidationRule::NotAnObject,
        });
    };

    let id = non_empty_str(obj.get("id"));
    let title = non_empty_str(obj.get("title"));
    let fail = |rule| ValidationError {
        title: title.unwrap_or_default().to_string(),
        id: id.unwrap_or_default().to_string(),
        rule,
    };

    if id.is_none() {
        return Err(fail(ValidationRule::MissingId));
    }
    if title.is_none() {
        return Err(fail(ValidationRule::MissingTitle));
    }

    let Some(sections) = obj.get("sections").and_then(Value::as_array) else {
        return Err(fail(ValidationRule::SectionsNotSequence));
    };

    for (index, section) in sections.iter().enumerate() {
        let Some(section) = section.as_object() else {
            return Err(fail(ValidationRule::SectionMissingId { index }));
        };
        if non_empty_str(section.get("id")).is_none() {
            return Err(fail(ValidationRule::SectionMissingId { index }));
        }
        if !matches!(section.get("title"), Some(Value::String(_))) {
            return Err(fail(ValidationRule::SectionTitleNotString { index }));
        }
        if !matches!(section.get("content"), None | Some(Value::String(_))) {
            return Err(fail(ValidationRule::SectionContentNotString { index }));
        }
    }

    Ok(())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;
    use serde_json::json;

    fn valid() -> Document {
        Document::new("b1", "T").with_section(Section::new("s1", "S", "<p>hi</p>"))
    }

    #[test]
    fn test_valid_document() {
        assert!(validate_document(&valid()));
    }

    #[test]
    fn test_document_without_sections_is_valid() {
        assert!(validate_document(&Document::new("b1", "T")));
    }

    #[test]
    fn test_missing_title() {
        let mut doc = valid();
        doc.title.clear();

        let err = check_document(&doc).unwrap_err();
        assert_eq!(err.rule, ValidationRule::MissingTitle);
        assert_eq!(err.id, "b1");
    }

    #[test]
    fn test_missing_id() {
        let mut doc = valid();
        doc.id.clear();
        assert_eq!(check_document(&doc).unwrap_err().rule, ValidationRule::MissingId);
    }

    #[test]
    fn test_section_missing_id() {
        let mut doc = valid();
        doc.sections.push(Section::new("", "Untitled", ""));

        let err = check_document(&doc).unwrap_err();
        assert_eq!(err.rule, ValidationRule::SectionMissingId { index: 1 });
        assert_eq!(err.title, "T");
    }

    #[test]
    fn test_empty_section_title_allowed() {
        let doc = Document::new("b1", "T").with_section(Section::new("s1", "", ""));
        assert!(validate_document(&doc));
    }

    #[test]
    fn test_value_valid() {
        let value = json!({
            "id": "b1",
            "title": "T",
            "sections": [
                {"id": "s1", "title": "S", "content": "<p>hi</p>"},
                {"id": "s2", "title": ""}
            ]
        });
        assert!(check_document_value(&value).is_ok());
    }

    #[test]
    fn test_value_sections_not_array() {
        let value = json!({"id": "b1", "title": "T", "sections": "nope"});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::SectionsNotSequence
        );

        let value = json!({"id": "b1", "title": "T"});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::SectionsNotSequence
        );
    }

    #[test]
    fn test_value_missing_title() {
        let value = json!({"id": "b1", "sections": []});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::MissingTitle
        );

        let value = json!({"id": "b1", "title": 7, "sections": []});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::MissingTitle
        );
    }

    #[test]
    fn test_value_section_rules() {
        let value = json!({"id": "b1", "title": "T", "sections": [{"title": "S"}]});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::SectionMissingId { index: 0 }
        );

        let value = json!({"id": "b1", "title": "T", "sections": [{"id": "s1", "title": null}]});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::SectionTitleNotString { index: 0 }
        );

        let value = json!({"id": "b1", "title": "T", "sections": [{"id": "s1", "title": "", "content": 3}]});
        assert_eq!(
            check_document_value(&value).unwrap_err().rule,
            ValidationRule::SectionContentNotString { index: 0 }
        );
    }

    #[test]
    fn test_value_not_object() {
        assert_eq!(
            check_document_value(&json!([1, 2])).unwrap_err().rule,
            ValidationRule::NotAnObject
        );
    }
}
