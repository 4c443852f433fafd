// ABOUTME: Error types for the pluck extraction toolkit.
// ABOUTME: Provides the PluckError enum covering parsing, transformation, and pagination failures.

use thiserror::Error;

/// Errors raised by parsing models, transformation pipelines, the document
/// parser façade, the HTTP collaborator, and the static paginator.
///
/// None of these are caught-and-defaulted internally: any error aborts the
/// enclosing `parse`/`transform`/paginator call. The only escape hatches are
/// the explicit `default` values on field specs.
#[derive(Debug, Error)]
pub enum PluckError {
    /// A required selection matched zero nodes (scalar field without a
    /// default, or any nested field).
    #[error("element with query \"{}\" not found", .query.as_deref().unwrap_or("no query provided"))]
    ElementNotFound { query: Option<String> },

    /// A `multiple` scalar field omitted its `query`.
    #[error("multiple field must have a 'query'")]
    MissingQuery,

    /// A middleware required a context field that is absent (or null).
    #[error("field with key \"{0}\" not found")]
    FieldNotFound(String),

    /// A typed middleware found a field of the wrong shape.
    #[error("field \"{key}\" is not a {expected}")]
    InvalidFieldType { key: String, expected: &'static str },

    /// An extractor name had no entry in the built-in catalog.
    #[error("extractor with name \"{0}\" not found")]
    ExtractorNotFound(String),

    /// A page template URL did not contain the `{page}` placeholder.
    #[error("the provided URL does not contain the string {{page}}: {0}")]
    InvalidUrl(String),

    /// A page transition left the `[min, max]` window.
    #[error("page {page} is outside the allowed range [{min}, {max}]")]
    PageOutOfRange { page: u32, min: u32, max: u32 },

    /// A page tracker failed to produce a raw value from the document.
    #[error("could not extract the {0} tracker value from the document")]
    PageParsingFailure(&'static str),

    /// A page tracker's transformer produced a non-numeric value.
    #[error("the {tracker} tracker produced a non-numeric value: \"{value}\"")]
    InvalidPageValue {
        tracker: &'static str,
        value: String,
    },

    /// Malformed JSON source, propagated from the deserializer.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A JSON path expression failed to compile or evaluate.
    #[error("invalid path expression \"{expression}\": {message}")]
    Path { expression: String, message: String },

    /// The HTTP collaborator failed at the transport level.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The HTTP collaborator received a non-success status.
    #[error("request to {url} failed with status code {code}")]
    Status { code: u16, url: String },
}

impl PluckError {
    /// Creates an ElementNotFound error for an optional query.
    pub fn element_not_found(query: impl Into<Option<String>>) -> Self {
        PluckError::ElementNotFound {
            query: query.into(),
        }
    }

    /// Creates a Path error from a jmespath failure.
    pub fn path(expression: impl Into<String>, err: impl std::fmt::Display) -> Self {
        PluckError::Path {
            expression: expression.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if this is an ElementNotFound error.
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, PluckError::ElementNotFound { .. })
    }

    /// Returns true if this is a PageOutOfRange error.
    pub fn is_page_out_of_range(&self) -> bool {
        matches!(self, PluckError::PageOutOfRange { .. })
    }
}

pub type Result<T, E = PluckError> = std::result::Result<T, E>;
