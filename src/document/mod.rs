//! Document model
//!
//! Documents, sections and processing errors as persisted in the library,
//! their structural validation, and the built-in sample document.

mod builtin;
mod types;
mod validation;

pub use builtin::{sample_document, LibraryEntry, SAMPLE_DOCUMENT_ID};
pub use types::*;
pub use validation::{check_document, check_document_value, validate_document};
