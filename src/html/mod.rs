//! HTML processing module
//!
//! Strips script-executing constructs from section content before it is
//! written and after it is read back.
//!
//! Uses lol_html for efficient streaming HTML processing.

mod sanitizer;

pub use sanitizer::{sanitize_html, SanitizeError};
