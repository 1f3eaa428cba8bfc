//! Scene: the persistent memory record for one uniquely-named room.
//!
//! A scene accumulates facts across repeated visits. Its text lists
//! (`description_lines`, `scene_items`, `npcs`, `narrations`) never hold
//! exact duplicates and only shrink on a full store reset. `current_items`
//! is the exception: it tracks what is here *now* and is rewritten by
//! ground-truth observations and item inference.

use serde::{Deserialize, Serialize};

use crate::labels::{self, push_unique};

/// Classification of a player command's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// The command moved the player to another room.
    Movement,
    /// Taking, dropping or otherwise handling a portable item.
    ItemInteraction,
    /// Opening, reading, examining fixed features of the world.
    WorldObjectInteraction,
    /// Anything else.
    GenericInteraction,
}

/// One player command plus its categorized outcome. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Engine move number (or store turn when the engine reports none).
    pub turn: u64,
    /// The command as typed.
    pub command: String,
    /// Outcome summary.
    pub result: String,
    /// Derived category.
    pub category: ActionCategory,
    /// Normalized verb ("take", "drop", "open", ...).
    pub verb: String,
    /// Direct object, without articles or destination clauses.
    pub target_item: Option<String>,
}

/// The most recent transition into a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneIntroduction {
    /// Room the player came from, when known.
    pub previous_room: Option<String>,
    /// Move number at which the player arrived.
    pub move_number: u64,
    /// Command that caused the arrival (empty when none).
    pub command: String,
}

/// Memory for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Room name as the engine first spelled it.
    pub room_name: String,
    /// Description paragraphs, in first-seen order.
    #[serde(default)]
    pub description_lines: Vec<String>,
    /// Every item ever observed here.
    #[serde(default)]
    pub scene_items: Vec<String>,
    /// Items believed to be here right now.
    #[serde(default)]
    pub current_items: Vec<String>,
    /// Commands issued in this room.
    #[serde(default)]
    pub action_records: Vec<ActionRecord>,
    /// Zero or one entry: the latest arrival.
    #[serde(default)]
    pub scene_intro_collection: Vec<SceneIntroduction>,
    /// Characters met here.
    #[serde(default)]
    pub npcs: Vec<String>,
    /// Narrator lines already produced for this room.
    #[serde(default)]
    pub narrations: Vec<String>,
    /// Number of ingested turns that resolved to this room.
    #[serde(default)]
    pub visit_count: u32,
    /// Store turn of the first visit.
    #[serde(default)]
    pub first_visit_turn: Option<u64>,
    /// Store turn of the latest visit.
    #[serde(default)]
    pub last_visit_turn: Option<u64>,
}

impl Scene {
    /// A fresh scene created on its first visit at `turn`.
    #[must_use]
    pub fn new(room_name: impl Into<String>, turn: u64) -> Self {
        Self {
            room_name: room_name.into(),
            description_lines: Vec::new(),
            scene_items: Vec::new(),
            current_items: Vec::new(),
            action_records: Vec::new(),
            scene_intro_collection: Vec::new(),
            npcs: Vec::new(),
            narrations: Vec::new(),
            visit_count: 0,
            first_visit_turn: Some(turn),
            last_visit_turn: None,
        }
    }

    /// Count a visit at `turn`.
    pub fn record_visit(&mut self, turn: u64) {
        self.visit_count += 1;
        self.last_visit_turn = Some(turn);
        if self.first_visit_turn.is_none() {
            self.first_visit_turn = Some(turn);
        }
    }

    /// Replace the introduction with the latest arrival.
    pub fn set_introduction(&mut self, intro: SceneIntroduction) {
        self.scene_intro_collection.clear();
        self.scene_intro_collection.push(intro);
    }

    /// Latest arrival, if any.
    #[must_use]
    pub fn introduction(&self) -> Option<&SceneIntroduction> {
        self.scene_intro_collection.last()
    }

    /// Merge description text paragraph by paragraph. Returns how many new
    /// paragraphs were appended.
    pub fn merge_description(&mut self, text: &str) -> usize {
        description_chunks(text)
            .iter()
            .filter(|chunk| push_unique(&mut self.description_lines, chunk))
            .count()
    }

    /// Merge an observation of visible items.
    ///
    /// New labels are added to `scene_items`. A `Some` observation is ground
    /// truth and replaces `current_items` wholesale; `None` leaves them alone.
    /// Returns whether ground truth was applied.
    pub fn merge_visible_items(&mut self, visible: Option<&[String]>) -> bool {
        let Some(visible) = visible else {
            return false;
        };
        for item in visible {
            push_unique(&mut self.scene_items, item);
        }
        let mut current = Vec::with_capacity(visible.len());
        for item in visible {
            push_unique(&mut current, item);
        }
        self.current_items = current;
        true
    }

    /// Append an action unless one with the same turn and command exists.
    pub fn push_action(&mut self, record: ActionRecord) -> bool {
        let duplicate = self
            .action_records
            .iter()
            .any(|r| r.turn == record.turn && r.command == record.command);
        if duplicate {
            return false;
        }
        self.action_records.push(record);
        true
    }

    /// Add a narrator line. Blank and duplicate lines are ignored.
    pub fn add_narration(&mut self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && push_unique(&mut self.narrations, text)
    }

    /// Register a character seen here.
    pub fn add_npc(&mut self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && push_unique(&mut self.npcs, name)
    }

    /// Put an item here (inferred drop). Also remembered in `scene_items`.
    pub fn add_current_item(&mut self, label: &str) {
        if labels::find_label(&self.current_items, label).is_none() {
            self.current_items.push(label.to_string());
        }
        push_unique(&mut self.scene_items, label);
    }

    /// Take an item from here (inferred acquire), returning the stored label.
    pub fn remove_current_item(&mut self, label: &str) -> Option<String> {
        labels::remove_label(&mut self.current_items, label)
    }
}

/// Split description text into paragraph chunks.
///
/// Paragraphs are separated by blank lines; soft-wrapped lines inside a
/// paragraph are rejoined with single spaces.
#[must_use]
pub fn description_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}
