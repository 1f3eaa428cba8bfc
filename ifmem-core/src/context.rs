//! Context snapshots handed to the narration renderer and status display.

use serde::{Deserialize, Serialize};

use crate::scene::Scene;
use crate::types::PlayerState;

/// Whether a snapshot carries a resolved room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    /// A room has resolved; `current_scene` is set.
    Ok,
    /// Nothing has resolved yet this session.
    NoContext,
}

/// Cross-scene aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    /// Every NPC registered in any scene.
    pub all_npcs: Vec<String>,
    /// Every item ever observed in any scene.
    pub all_items: Vec<String>,
    /// Number of known scenes.
    pub scene_count: usize,
}

/// Short form of another recently visited scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    /// Room name.
    pub room_name: String,
    /// Description paragraphs.
    pub description_lines: Vec<String>,
    /// Number of visits.
    pub visit_count: u32,
}

impl From<&Scene> for SceneSummary {
    fn from(scene: &Scene) -> Self {
        Self {
            room_name: scene.room_name.clone(),
            description_lines: scene.description_lines.clone(),
            visit_count: scene.visit_count,
        }
    }
}

/// Per-turn facts that are not memory: set by the session before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnHints {
    /// Command the player just typed.
    pub command: Option<String>,
    /// Engine body text for this turn.
    pub engine_excerpt: Option<String>,
    /// The engine rejected the command.
    pub is_exception: bool,
    /// The engine's complaint, when it rejected the command.
    pub exception_message: Option<String>,
}

/// Immutable view of the store for one turn.
///
/// Serialized to JSON and read by the prompt renderer through dotted paths
/// such as `current_scene.narrations` or `player_state.inventory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextView {
    /// `ok` or `no_context`.
    pub status: ContextStatus,
    /// Name the narrator uses for the player.
    pub player_name: String,
    /// Store turns ingested so far.
    pub turn_count: u64,
    /// Room resolved most recently.
    pub current_room: Option<String>,
    /// Full record of the current room.
    pub current_scene: Option<Scene>,
    /// Global player state.
    pub player_state: PlayerState,
    /// Cross-scene aggregates.
    pub world: WorldSummary,
    /// Other scenes, most recently visited first.
    pub recent_scene_summaries: Vec<SceneSummary>,
    /// Set by the session pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_hints: Option<TurnHints>,
}

impl ContextView {
    /// Attach per-turn hints.
    #[must_use]
    pub fn with_turn_hints(mut self, hints: TurnHints) -> Self {
        self.turn_hints = Some(hints);
        self
    }

    /// JSON form consumed by the renderer.
    ///
    /// # Errors
    /// Returns [`IfMemError::Serialization`](crate::IfMemError::Serialization)
    /// if encoding fails.
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| crate::IfMemError::Serialization(e.to_string()))
    }
}
