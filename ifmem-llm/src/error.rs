//! LLM-side error types.

use thiserror::Error;

/// Errors from prompt spec loading, rendering and narrator calls.
///
/// Spec errors (`UnsupportedSpecVersion`, `InvalidSpec`,
/// `UndeclaredPlaceholder`) are raised at load time and are meant to abort
/// startup. `MissingTemplateField` is the only render-time failure.
#[derive(Debug, Error)]
pub enum LlmError {
    /// `spec_version` is not one this renderer understands.
    #[error("Unsupported prompt spec version: {0:?} (expected \"1.0\")")]
    UnsupportedSpecVersion(String),

    /// Structurally valid JSON that breaks a spec rule.
    #[error("Invalid prompt spec: {0}")]
    InvalidSpec(String),

    /// A template references a name that no value source declares.
    #[error("Undeclared placeholder {{{placeholder}}} in {context}")]
    UndeclaredPlaceholder {
        /// Where the placeholder appeared, e.g. `blocks[2].lines[0]`.
        context: String,
        /// The placeholder name.
        placeholder: String,
    },

    /// A `list_of_objects` record lacks a field its template references.
    #[error("Record in value source {value_source:?} has no field {field:?}")]
    MissingTemplateField {
        /// Name of the value source being rendered.
        value_source: String,
        /// The missing field.
        field: String,
    },

    /// Input was not valid JSON or did not match the expected shape.
    #[error("Failed to parse JSON: {0}")]
    ParseError(String),

    /// Narrator request failed.
    #[error("Narration request failed: {0}")]
    RequestFailed(String),

    /// Narrator request timed out.
    #[error("Narration request timed out after {0}ms")]
    Timeout(u64),

    /// Narrator backend is unavailable.
    #[error("Narrator unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),

    /// Reading a spec or schema file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, LlmError>;
