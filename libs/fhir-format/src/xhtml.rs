//! Narrative XHTML handling for `xhtml` values

use crate::error::{FormatError, Result};
use crate::xml::XHTML_NS;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Predefined XML entities and numeric character references
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:amp|lt|gt|quot|apos|#[0-9]+|#x[0-9a-fA-F]+);")
        .expect("entity regex must compile")
});

/// Escape every `&` that does not start a recognized entity or character
/// reference.
pub fn escape_ampersands(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for (i, ch) in raw.char_indices() {
        if ch == '&' && !ENTITY.is_match(&raw[i..]) {
            out.push_str("&amp;");
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Make a narrative `div` ready for embedding: escape stray ampersands,
/// require well-formed markup and put the root in the XHTML namespace.
pub fn prepare_div(raw: &str) -> Result<String> {
    let escaped = escape_ampersands(raw.trim());
    let document = roxmltree::Document::parse(&escaped)
        .map_err(|e| FormatError::InvalidXhtml(e.to_string()))?;
    let root = document.root_element();

    if root.tag_name().name() != "div" {
        return Err(FormatError::InvalidXhtml(format!(
            "root element is '{}', expected 'div'",
            root.tag_name().name()
        )));
    }
    match root.tag_name().namespace() {
        Some(XHTML_NS) => Ok(escaped.into_owned()),
        Some(other) => Err(FormatError::InvalidXhtml(format!(
            "div is in namespace '{}'",
            other
        ))),
        None => {
            let at = root.range().start + "<div".len();
            let mut markup = escaped.into_owned();
            markup.insert_str(at, &format!(" xmlns=\"{}\"", XHTML_NS));
            Ok(markup)
        }
    }
}
