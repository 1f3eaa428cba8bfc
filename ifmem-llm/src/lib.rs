//! # ifmem-llm: narration prompt rendering and payload normalization
//!
//! Everything between the scene store's context snapshot and the external
//! narrator backend:
//!
//! - [`PromptSpec`]: versioned JSON configuration of value sources and
//!   blocks, validated when loaded
//! - [`render`]: context JSON + spec → system and user messages
//! - [`normalize`]: raw model payload → schema-shaped object
//!
//! The crate works on `serde_json::Value` and knows nothing about scenes;
//! any context with matching paths renders. No network I/O happens here.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod normalize;
pub mod prompt;
pub mod spec;
pub mod types;

pub use error::LlmError;
pub use normalize::{builtin_response_schema, normalize, parse_reply};
pub use prompt::{build_narration_job, render};
pub use spec::{PromptSpec, ValueSource};
pub use types::{ChatMessage, JobMetadata, NarrationJob, NarrationPayload, RenderedPrompt, Role};
