//! Error types.
//!
//! Soft misses are not errors: an unknown relation resolves to an empty
//! href, an unreachable path reads as `None`. Errors are reserved for
//! malformed documents and calls that cannot be answered.

use thiserror::Error;

/// Structural problems with a hypermedia resource or document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HypermediaError {
    /// `url()` was read on a resource without a `self` relation.
    #[error("not a hypermedia resource: no self link")]
    NotHypermedia,

    /// A templated relation was resolved without expansion parameters.
    #[error("relation `{rel}` is templated but no expansion parameters were given")]
    MissingTemplateParams { rel: String },

    /// A curie link without `templated: true`.
    #[error("curie `{name}` must be templated")]
    UntemplatedCurie { name: String },
}

/// Errors surfaced by model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Hypermedia(#[from] HypermediaError),

    /// The validation hook rejected a `set`. Nothing was mutated and no
    /// events were emitted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A document that is not a JSON object.
    #[error("expected a JSON object document, found {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
