//! Core type definitions shared by the parser and the scene store.
//!
//! Field names are part of the external contract: snapshots and persisted
//! scenes serialize them verbatim.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

/// Player status figures reported by a single transcript.
///
/// Every field is optional: `None` means "the transcript did not say", which
/// is different from an empty inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    /// Items listed after "You are carrying:" / "You have:".
    pub inventory: Option<Vec<String>>,
    /// Value after "Score:".
    pub score: Option<u32>,
    /// Value after "Moves:".
    pub moves: Option<u32>,
}

/// Structured facts extracted from one raw engine transcript.
///
/// Built fresh per turn by [`parse_engine_facts`](crate::heuristics::parse_engine_facts)
/// and consumed once by the scene store.
///
/// Invariant: when `is_exception` is set, `room_name` and `description` are
/// both `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFacts {
    /// Room named on the status header line.
    pub room_name: Option<String>,
    /// Inventory, score and moves.
    pub player_state: PlayerStateSnapshot,
    /// Items mentioned by "There is ..." / "You see ..." sentences.
    /// `None` means no data; it is never `Some(vec![])`.
    pub visible_items: Option<Vec<String>>,
    /// Body text following the header.
    pub description: Option<String>,
    /// The transcript had no status header (parser error, engine complaint).
    pub is_exception: bool,
    /// Best human-readable line from an exception transcript.
    pub exception_message: Option<String>,
}

impl EngineFacts {
    /// Facts for a transcript that resolved to a room.
    #[must_use]
    pub fn room(room_name: impl Into<String>) -> Self {
        Self {
            room_name: Some(room_name.into()),
            ..Self::default()
        }
    }

    /// Facts for an exception transcript.
    #[must_use]
    pub fn exception(message: Option<String>) -> Self {
        Self {
            is_exception: true,
            exception_message: message,
            ..Self::default()
        }
    }

    /// Set the description text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the visible items (ground truth for the room's current items).
    #[must_use]
    pub fn with_visible_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.visible_items = if items.is_empty() { None } else { Some(items) };
        self
    }

    /// Set score and moves.
    #[must_use]
    pub fn with_status(mut self, score: u32, moves: u32) -> Self {
        self.player_state.score = Some(score);
        self.player_state.moves = Some(moves);
        self
    }

    /// Set the reported inventory.
    #[must_use]
    pub fn with_inventory<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.player_state.inventory = Some(items.into_iter().map(Into::into).collect());
        self
    }
}

// ---------------------------------------------------------------------------
// Store-global player state
// ---------------------------------------------------------------------------

/// The store's running view of the player, merged across turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current inventory labels.
    pub inventory: Vec<String>,
    /// Last reported score.
    pub score: Option<u32>,
    /// Last reported move count.
    pub moves: Option<u32>,
}
