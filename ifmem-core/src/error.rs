//! Error types for the ifmem core library.

use thiserror::Error;

/// Top-level error type for all core operations.
///
/// The transcript parser never returns one of these (it is total), and the
/// scene store swallows persistence failures after logging them. Errors only
/// surface from configuration loading and from direct use of a
/// [`SceneRepository`](crate::persistence::SceneRepository).
#[derive(Error, Debug)]
pub enum IfMemError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, IfMemError>;
