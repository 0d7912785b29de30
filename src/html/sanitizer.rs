//! Script stripping using lol_html for streaming HTML processing
//!
//! This is a minimal denylist sanitizer, not a full HTML sanitizer. It removes
//! `<script>` elements together with their content and every inline event
//! handler attribute (`on*`). It does NOT strip `<iframe>`, `<style>`,
//! `<object>`/`<embed>`, `javascript:` or `data:` URLs in `src`/`href`, or
//! SVG-based vectors. Content rendered from storage must still be displayed in
//! a context that tolerates those.

use lol_html::{element, rewrite_str, RewriteStrSettings};

/// Errors from the HTML rewriter
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

/// Remove script elements and inline event handlers.
///
/// Never fails: if the rewriter rejects the input, the whole fragment is
/// HTML-escaped so it renders as inert text. Idempotent.
pub fn sanitize_html(html: &str) -> String {
    match strip_scripts(html) {
        Ok(clean) => clean,
        Err(e) => {
            tracing::warn!(error = %e, "Sanitizer could not rewrite HTML, escaping content");
            html_escape::encode_text(html).into_owned()
        }
    }
}

/// Whether an attribute name is an inline event handler
fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"))
}

fn strip_scripts(html: &str) -> Result<String, SanitizeError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                // Remove script elements entirely, content included
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                // Strip event handler attributes from all elements
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| is_event_handler(name))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| SanitizeError::RewriteError(e.to_string()))
}
