//! Error types for the session pipeline.

use ifmem_core::IfMemError;
use ifmem_llm::LlmError;

/// Errors that abort session startup or a single turn.
///
/// Narrator failures never surface here; they degrade to the fallback
/// payload inside [`NarrationSession::play_turn`](crate::NarrationSession::play_turn).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Scene memory, persistence or configuration failure.
    #[error(transparent)]
    Memory(#[from] IfMemError),

    /// Prompt spec, schema or rendering failure.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SessionError>;
