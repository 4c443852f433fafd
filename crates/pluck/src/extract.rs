// ABOUTME: Built-in extractor functions mapping a matched HTML node to a scalar value.
// ABOUTME: Includes a by-name lookup used when schemas are loaded from configuration.

//! Built-in node extractors.
//!
//! An [`Extractor`] is a pure function from a matched element to an optional
//! string: `None` models "this node has no such value" (a missing attribute,
//! an empty normalized text). Extractors never fail; whether a `None` result
//! is an error is decided by the parsing model that applied it.

use std::sync::Arc;

use scraper::ElementRef;

use crate::error::{PluckError, Result};

/// A pure function converting a matched element into a scalar value.
pub type Extractor = Arc<dyn Fn(&ElementRef) -> Option<String> + Send + Sync>;

/// Collapses runs of whitespace into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the concatenated text content of the element.
pub fn text() -> Extractor {
    Arc::new(|el| Some(el.text().collect::<String>()))
}

/// Extracts text with whitespace collapsed; yields `None` when the result is
/// empty.
pub fn normalized_text() -> Extractor {
    Arc::new(|el| {
        let normalized = normalize_whitespace(&el.text().collect::<String>());
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    })
}

/// Extracts the element's inner HTML.
pub fn inner_html() -> Extractor {
    Arc::new(|el| Some(el.inner_html()))
}

/// Extracts the element's outer HTML (the element itself plus its contents).
pub fn outer_html() -> Extractor {
    Arc::new(|el| Some(el.html()))
}

/// Extracts the value of a named attribute.
pub fn attribute(name: impl Into<String>) -> Extractor {
    let name = name.into();
    Arc::new(move |el| el.value().attr(&name).map(str::to_string))
}

/// Extracts the `href` attribute.
pub fn href() -> Extractor {
    attribute("href")
}

/// Extracts the `src` attribute.
pub fn src() -> Extractor {
    attribute("src")
}

/// Extracts the `value` attribute.
pub fn value() -> Extractor {
    attribute("value")
}

/// Extracts the element's tag name.
pub fn tag_name() -> Extractor {
    Arc::new(|el| Some(el.value().name().to_string()))
}

/// Extracts the element's class list as a space-separated string.
pub fn class_list() -> Extractor {
    Arc::new(|el| Some(el.value().classes().collect::<Vec<_>>().join(" ")))
}

/// Extracts the element's `id` attribute.
pub fn id() -> Extractor {
    Arc::new(|el| el.value().id().map(str::to_string))
}

/// Resolves a built-in extractor by name.
///
/// Attribute extraction uses the `attr:<name>` form, e.g. `attr:data-id`.
pub fn by_name(name: &str) -> Result<Extractor> {
    match name {
        "text" => Ok(text()),
        "normalized_text" => Ok(normalized_text()),
        "inner_html" => Ok(inner_html()),
        "outer_html" => Ok(outer_html()),
        "href" => Ok(href()),
        "src" => Ok(src()),
        "value" => Ok(value()),
        "tag_name" => Ok(tag_name()),
        "class_list" => Ok(class_list()),
        "id" => Ok(id()),
        other => match other.strip_prefix("attr:") {
            Some(attr) if !attr.is_empty() => Ok(attribute(attr)),
            _ => Err(PluckError::ExtractorNotFound(other.to_string())),
        },
    }
}
