//! # ifmem-session: turn pipeline for ifmem
//!
//! Ties the pieces together for a host that drives a text adventure:
//!
//! ```text
//! transcript ──▶ parse_engine_facts ──▶ SceneMemoryStore::ingest
//!                                              │
//!                                   context_snapshot + hints
//!                                              ▼
//!                 Narrator ◀── NarrationJob ◀── render
//!                    │
//!                    ▼
//!          parse_reply ──▶ normalize ──▶ append_narration
//! ```
//!
//! ## Modules
//!
//! - `pipeline`: [`NarrationSession`] and the [`Narrator`] seam
//! - `status`: [`StatusLine`] for an external status display
//! - `error`: [`SessionError`]

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod pipeline;
pub mod status;

pub use error::SessionError;
pub use pipeline::{NarrationSession, Narrator, TurnOutcome};
pub use status::StatusLine;
