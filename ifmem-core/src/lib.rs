//! # ifmem core library
//!
//! Scene memory for interactive fiction. Raw engine transcripts go in,
//! structured per-room memory comes out:
//!
//! - **Heuristics**: transcript text → [`EngineFacts`] (room, status, items)
//! - **Scenes**: one [`Scene`] per room, accumulating descriptions, items,
//!   actions and narration across visits without duplicates
//! - **Store**: [`SceneMemoryStore`] folds facts into scenes and hands out
//!   [`ContextView`] snapshots for the narration renderer
//! - **Persistence**: optional SQLite write-through behind
//!   [`SceneRepository`]
//!
//! Nothing here performs network I/O.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod config;
pub mod context;
pub mod error;
pub mod heuristics;
pub mod labels;
pub mod persistence;
pub mod scene;
pub mod store;
pub mod types;

pub use config::{IfMemConfig, MemoryConfig};
pub use context::{ContextStatus, ContextView, SceneSummary, TurnHints, WorldSummary};
pub use error::IfMemError;
pub use heuristics::parse_engine_facts;
pub use persistence::{SceneRepository, SqliteSceneRepository};
pub use scene::{ActionCategory, ActionRecord, Scene, SceneIntroduction};
pub use store::SceneMemoryStore;
pub use types::{EngineFacts, PlayerState, PlayerStateSnapshot};
