//! Scene memory store: owns every [`Scene`] and the player state for one
//! session.
//!
//! The store is a plain owned object, not thread-safe. Callers serialize
//! `ingest` calls; the session crate wraps the store in a mutex and resolves
//! one turn at a time.
//!
//! Every mutation is written through to an optional [`SceneRepository`].
//! Write failures are logged and swallowed: the in-memory state stays
//! authoritative and gameplay never aborts on a lost save.
//!
//! Audit events are emitted on the `ifmem::audit` target with an `event`
//! field naming what happened.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::actions::{
    CommandIntent, classify_command, derive_category, is_successful_acquire, is_successful_drop,
};
use crate::config::MemoryConfig;
use crate::context::{ContextStatus, ContextView, SceneSummary, WorldSummary};
use crate::heuristics::body_after_header;
use crate::labels::{self, find_label, normalize_label, push_unique, remove_label};
use crate::persistence::SceneRepository;
use crate::scene::{ActionRecord, Scene, SceneIntroduction, description_chunks};
use crate::types::{EngineFacts, PlayerState, PlayerStateSnapshot};

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "ifmem::audit";

/// Key under which a room is stored: trimmed, lowercased, whitespace collapsed.
#[must_use]
pub fn room_key(room_name: &str) -> String {
    normalize_label(room_name)
}

/// Per-session scene memory.
pub struct SceneMemoryStore {
    scenes: HashMap<String, Scene>,
    player: PlayerState,
    turn_count: u64,
    current_room: Option<String>,
    player_name: String,
    config: MemoryConfig,
    repository: Option<Box<dyn SceneRepository>>,
}

impl std::fmt::Debug for SceneMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneMemoryStore")
            .field("scenes", &self.scenes.len())
            .field("turn_count", &self.turn_count)
            .field("current_room", &self.current_room)
            .field("persistent", &self.repository.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SceneMemoryStore {
    fn default() -> Self {
        Self::new("Adventurer", MemoryConfig::default())
    }
}

impl SceneMemoryStore {
    /// An empty, memory-only store.
    #[must_use]
    pub fn new(player_name: impl Into<String>, config: MemoryConfig) -> Self {
        Self {
            scenes: HashMap::new(),
            player: PlayerState::default(),
            turn_count: 0,
            current_room: None,
            player_name: player_name.into(),
            config,
            repository: None,
        }
    }

    /// A store backed by `repository`, rehydrated from whatever it holds.
    ///
    /// The turn counter resumes from the latest stored visit and the most
    /// recently visited scene becomes current. Load failures are logged and
    /// leave the store empty.
    #[must_use]
    pub fn with_repository(
        player_name: impl Into<String>,
        config: MemoryConfig,
        repository: Box<dyn SceneRepository>,
    ) -> Self {
        let mut store = Self::new(player_name, config);

        match repository.load_scenes() {
            Ok(rows) => {
                for (key, scene) in rows {
                    store.scenes.insert(key, scene);
                }
            }
            Err(e) => warn!(error = %e, "Failed to load persisted scenes"),
        }
        match repository.load_player_state() {
            Ok(Some(player)) => store.player = player,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load persisted player state"),
        }

        let latest = store
            .scenes
            .iter()
            .filter_map(|(key, scene)| scene.last_visit_turn.map(|turn| (turn, key)))
            .max();
        if let Some((turn, key)) = latest {
            store.turn_count = turn;
            store.current_room = Some(key.clone());
        }

        info!(
            scenes = store.scenes.len(),
            turn = store.turn_count,
            "Scene memory rehydrated"
        );
        store.repository = Some(repository);
        store
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Fold one turn's facts into memory.
    ///
    /// `previous_room` is the room resolved on the prior turn; `raw_transcript`
    /// is only used to summarize the action result when the description is
    /// empty.
    pub fn ingest(
        &mut self,
        facts: &EngineFacts,
        command: Option<&str>,
        previous_room: Option<&str>,
        raw_transcript: Option<&str>,
    ) {
        self.turn_count += 1;
        let turn = self.turn_count;
        let command = command.map(str::trim).filter(|c| !c.is_empty());

        let room_name = match facts.room_name.as_deref() {
            Some(name) if !facts.is_exception => name,
            _ => {
                info!(
                    target: AUDIT_TARGET,
                    event = "engine_exception",
                    turn,
                    command = command.unwrap_or(""),
                    message = facts.exception_message.as_deref().unwrap_or(""),
                    "Engine exception, no scene update"
                );
                return;
            }
        };

        let key = room_key(room_name);
        let engine_turn = facts.player_state.moves.map_or(turn, u64::from);
        let previous_key = previous_room.map(room_key);
        let room_changed = previous_key.as_deref().is_some_and(|prev| prev != key);

        let created = !self.scenes.contains_key(&key);
        if created {
            info!(
                target: AUDIT_TARGET,
                event = "scene_created",
                turn,
                room = %room_name,
                "New scene"
            );
        }

        let player_changed = self.merge_player_state(&facts.player_state, turn);

        let scene = self
            .scenes
            .entry(key.clone())
            .or_insert_with(|| Scene::new(room_name, turn));
        scene.record_visit(turn);

        if room_changed || (previous_room.is_none() && scene.introduction().is_none()) {
            scene.set_introduction(SceneIntroduction {
                previous_room: previous_room.map(|p| p.trim().to_string()),
                move_number: engine_turn,
                command: command.unwrap_or_default().to_string(),
            });
        }

        let intent = command.map(classify_command);
        let is_action_feedback = self.config.separate_action_feedback
            && !created
            && !room_changed
            && intent.as_ref().is_some_and(|i| !i.is_look());
        if let Some(description) = facts.description.as_deref() {
            if is_action_feedback {
                debug!(room = %room_name, "Description held back as action feedback");
            } else {
                let added = scene.merge_description(description);
                debug!(room = %room_name, added, "Merged description");
            }
        }

        let ground_truth = scene.merge_visible_items(facts.visible_items.as_deref());

        let mut inventory_inferred = false;
        if let (Some(command), Some(intent)) = (command, intent) {
            let result = action_result(facts, room_name, room_changed, raw_transcript);
            let record = ActionRecord {
                turn: engine_turn,
                command: command.to_string(),
                result,
                category: derive_category(&intent, room_changed),
                verb: intent.verb.clone(),
                target_item: intent.target.clone(),
            };
            let result = record.result.clone();
            let category = record.category;
            if scene.push_action(record) {
                info!(
                    target: AUDIT_TARGET,
                    event = "action_recorded",
                    turn = engine_turn,
                    room = %room_name,
                    command,
                    category = ?category,
                    "Action recorded"
                );
                if !ground_truth {
                    inventory_inferred =
                        infer_item_effects(scene, &mut self.player.inventory, &intent, &result);
                }
            }
        }

        self.current_room = Some(key.clone());
        self.persist_scene(&key);
        if player_changed || inventory_inferred {
            self.persist_player_state();
        }

        info!(
            target: AUDIT_TARGET,
            event = "turn_recorded",
            turn,
            room = %room_name,
            "Turn recorded"
        );
    }

    /// Merge reported player figures; returns whether anything changed.
    fn merge_player_state(&mut self, snapshot: &PlayerStateSnapshot, turn: u64) -> bool {
        let mut changed = false;

        if let Some(inventory) = snapshot.inventory.as_deref() {
            if !labels::same_label_set(&self.player.inventory, inventory) {
                info!(
                    target: AUDIT_TARGET,
                    event = "inventory_changed",
                    turn,
                    before = self.player.inventory.len(),
                    after = inventory.len(),
                    "Inventory changed"
                );
                self.player.inventory = inventory.to_vec();
                changed = true;
            }
        }
        if let Some(score) = snapshot.score {
            if self.player.score != Some(score) {
                info!(
                    target: AUDIT_TARGET,
                    event = "score_changed",
                    turn,
                    before = ?self.player.score,
                    after = score,
                    "Score changed"
                );
                self.player.score = Some(score);
                changed = true;
            }
        }
        if let Some(moves) = snapshot.moves {
            if self.player.moves != Some(moves) {
                debug!(
                    target: AUDIT_TARGET,
                    event = "moves_changed",
                    turn,
                    before = ?self.player.moves,
                    after = moves,
                    "Moves changed"
                );
                self.player.moves = Some(moves);
                changed = true;
            }
        }
        changed
    }

    // ------------------------------------------------------------------
    // Other writers
    // ------------------------------------------------------------------

    /// Remember a narrator line for `room` (the current room when `None`).
    ///
    /// Returns `false` when the room is unknown or the line is blank or
    /// already stored.
    pub fn append_narration(&mut self, room: Option<&str>, text: &str) -> bool {
        let Some(key) = self.resolve_key(room) else {
            debug!("Narration dropped, no room resolved");
            return false;
        };
        let Some(scene) = self.scenes.get_mut(&key) else {
            debug!(room = %key, "Narration dropped, unknown room");
            return false;
        };
        if !scene.add_narration(text) {
            return false;
        }
        info!(
            target: AUDIT_TARGET,
            event = "narration_appended",
            room = %scene.room_name,
            chars = text.len(),
            "Narration appended"
        );
        self.persist_scene(&key);
        true
    }

    /// Register a character met in `room` (the current room when `None`).
    pub fn record_npc(&mut self, room: Option<&str>, name: &str) -> bool {
        let Some(key) = self.resolve_key(room) else {
            return false;
        };
        let added = self
            .scenes
            .get_mut(&key)
            .is_some_and(|scene| scene.add_npc(name));
        if added {
            debug!(room = %key, npc = %name.trim(), "NPC recorded");
            self.persist_scene(&key);
        }
        added
    }

    /// Forget everything, including persisted rows.
    pub fn reset(&mut self) {
        let scenes = self.scenes.len();
        self.scenes.clear();
        self.player = PlayerState::default();
        self.turn_count = 0;
        self.current_room = None;
        if let Some(repository) = &self.repository {
            if let Err(e) = repository.clear() {
                warn!(error = %e, "Failed to clear persisted scenes");
            }
        }
        info!(target: AUDIT_TARGET, event = "store_reset", scenes, "Scene memory reset");
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// Snapshot for the current room, or a `no_context` view before any
    /// room has resolved.
    #[must_use]
    pub fn context_snapshot(&self) -> ContextView {
        let current = self
            .current_room
            .as_ref()
            .and_then(|key| self.scenes.get(key).map(|scene| (key, scene)));

        let mut ordered: Vec<(&String, &Scene)> = self.scenes.iter().collect();
        ordered.sort_by(|(ka, a), (kb, b)| {
            a.first_visit_turn
                .cmp(&b.first_visit_turn)
                .then_with(|| ka.cmp(kb))
        });

        let mut world = WorldSummary {
            scene_count: self.scenes.len(),
            ..WorldSummary::default()
        };
        for (_, scene) in &ordered {
            for npc in &scene.npcs {
                push_unique(&mut world.all_npcs, npc);
            }
            for item in &scene.scene_items {
                push_unique(&mut world.all_items, item);
            }
        }

        let current_key = current.map(|(key, _)| key);
        let mut others: Vec<&Scene> = ordered
            .iter()
            .filter(|(key, _)| Some(*key) != current_key)
            .map(|(_, scene)| *scene)
            .collect();
        others.sort_by(|a, b| b.last_visit_turn.cmp(&a.last_visit_turn));
        let recent_scene_summaries = others
            .into_iter()
            .take(self.config.recent_scene_summaries)
            .map(SceneSummary::from)
            .collect();

        ContextView {
            status: if current.is_some() {
                ContextStatus::Ok
            } else {
                ContextStatus::NoContext
            },
            player_name: self.player_name.clone(),
            turn_count: self.turn_count,
            current_room: current.map(|(_, scene)| scene.room_name.clone()),
            current_scene: current.map(|(_, scene)| scene.clone()),
            player_state: self.player.clone(),
            world,
            recent_scene_summaries,
            turn_hints: None,
        }
    }

    /// Scene for `room_name`, if known.
    #[must_use]
    pub fn scene(&self, room_name: &str) -> Option<&Scene> {
        self.scenes.get(&room_key(room_name))
    }

    /// Number of known scenes.
    #[must_use]
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Global player state.
    #[must_use]
    pub fn player_state(&self) -> &PlayerState {
        &self.player
    }

    /// Turns ingested so far.
    #[must_use]
    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    /// Name of the most recently resolved room.
    #[must_use]
    pub fn current_room(&self) -> Option<&str> {
        self.current_room
            .as_ref()
            .and_then(|key| self.scenes.get(key))
            .map(|scene| scene.room_name.as_str())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn resolve_key(&self, room: Option<&str>) -> Option<String> {
        match room {
            Some(name) => Some(room_key(name)),
            None => self.current_room.clone(),
        }
    }

    fn persist_scene(&self, key: &str) {
        let (Some(repository), Some(scene)) = (&self.repository, self.scenes.get(key)) else {
            return;
        };
        if let Err(e) = repository.save_scene(key, scene) {
            warn!(room = %key, error = %e, "Scene write-through failed");
        }
    }

    fn persist_player_state(&self) {
        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save_player_state(&self.player) {
                warn!(error = %e, "Player state write-through failed");
            }
        }
    }
}

/// Outcome summary for an action record: the new room on a transition, else
/// the first meaningful description paragraph, else the body after the
/// header, else `"..."`.
fn action_result(
    facts: &EngineFacts,
    room_name: &str,
    room_changed: bool,
    raw_transcript: Option<&str>,
) -> String {
    if room_changed {
        return room_name.to_string();
    }
    facts
        .description
        .as_deref()
        .and_then(|text| {
            description_chunks(text)
                .into_iter()
                .find(|chunk| !chunk.eq_ignore_ascii_case(room_name))
        })
        .or_else(|| raw_transcript.and_then(body_after_header))
        .unwrap_or_else(|| "...".to_string())
}

/// Apply take/drop effects implied by a command and its outcome text.
/// Returns whether the inventory changed.
fn infer_item_effects(
    scene: &mut Scene,
    inventory: &mut Vec<String>,
    intent: &CommandIntent,
    result: &str,
) -> bool {
    let Some(target) = intent.target.as_deref() else {
        return false;
    };

    if intent.is_acquire() && is_successful_acquire(result) {
        let label = scene
            .remove_current_item(target)
            .unwrap_or_else(|| target.to_string());
        if find_label(inventory, &label).is_some() {
            return false;
        }
        info!(
            target: AUDIT_TARGET,
            event = "item_acquired",
            room = %scene.room_name,
            item = %label,
            "Item acquired"
        );
        inventory.push(label);
        return true;
    }

    if intent.is_drop() && is_successful_drop(result) {
        let label = remove_label(inventory, target).unwrap_or_else(|| target.to_string());
        info!(
            target: AUDIT_TARGET,
            event = "item_dropped",
            room = %scene.room_name,
            item = %label,
            "Item dropped"
        );
        scene.add_current_item(&label);
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::parse_engine_facts;
    use crate::persistence::SqliteSceneRepository;
    use crate::scene::ActionCategory;
    use crate::config::PersistenceConfig;

    fn store() -> SceneMemoryStore {
        SceneMemoryStore::default()
    }

    #[test]
    fn exception_only_advances_turn() {
        let mut store = store();
        store.ingest(
            &EngineFacts::exception(Some("I don't know the word \"xyzzy\".".into())),
            Some("xyzzy"),
            None,
            None,
        );
        assert_eq!(store.turn_count(), 1);
        assert_eq!(store.scene_count(), 0);
        assert_eq!(store.context_snapshot().status, ContextStatus::NoContext);
    }

    #[test]
    fn first_visit_creates_scene() {
        let mut store = store();
        let facts = EngineFacts::room("West of House")
            .with_status(0, 1)
            .with_description("You are standing in an open field.");
        store.ingest(&facts, None, None, None);

        let scene = store.scene("west of house").expect("scene");
        assert_eq!(scene.room_name, "West of House");
        assert_eq!(scene.visit_count, 1);
        assert_eq!(scene.first_visit_turn, Some(1));
        assert_eq!(scene.last_visit_turn, Some(1));
        assert_eq!(scene.scene_intro_collection.len(), 1);
        assert!(scene.action_records.is_empty());
        assert_eq!(store.player_state().score, Some(0));
    }

    #[test]
    fn same_room_turn_keeps_intro() {
        let mut store = store();
        store.ingest(&EngineFacts::room("Attic"), None, Some("Kitchen"), None);
        store.ingest(&EngineFacts::room("Attic"), Some("look"), Some("Attic"), None);
        let scene = store.scene("Attic").expect("scene");
        assert_eq!(scene.visit_count, 2);
        assert_eq!(
            scene.introduction().and_then(|i| i.previous_room.as_deref()),
            Some("Kitchen")
        );
    }

    #[test]
    fn movement_result_is_new_room() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("North of House").with_description("You are facing the north side."),
            Some("north"),
            Some("West of House"),
            None,
        );
        let action = &store.scene("North of House").expect("scene").action_records[0];
        assert_eq!(action.category, ActionCategory::Movement);
        assert_eq!(action.result, "North of House");
        assert_eq!(action.verb, "north");
    }

    #[test]
    fn result_falls_back_to_body_then_ellipsis() {
        let mut store = store();
        let transcript = "Attic    Score: 0    Moves: 4\nAttic";
        store.ingest(&parse_engine_facts(transcript), Some("wait"), Some("Attic"), Some(transcript));
        let scene = store.scene("Attic").expect("scene");
        assert_eq!(scene.action_records[0].result, "Attic");

        store.ingest(&EngineFacts::room("Attic"), Some("z"), Some("Attic"), None);
        let scene = store.scene("Attic").expect("scene");
        assert_eq!(scene.action_records[1].result, "...");
    }

    #[test]
    fn repeated_turn_and_command_dedupe() {
        let mut store = store();
        let facts = EngineFacts::room("Attic").with_status(0, 7).with_description("Dusty.");
        store.ingest(&facts, Some("look"), Some("Attic"), None);
        store.ingest(&facts, Some("look"), Some("Attic"), None);
        let scene = store.scene("Attic").expect("scene");
        assert_eq!(scene.action_records.len(), 1);
        assert_eq!(scene.action_records[0].turn, 7);
        assert_eq!(scene.description_lines, vec!["Dusty."]);
    }

    #[test]
    fn take_moves_item_into_inventory() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("Attic").with_visible_items(["brass lantern", "rope"]),
            None,
            None,
            None,
        );
        store.ingest(
            &EngineFacts::room("Attic").with_description("Taken."),
            Some("take lantern"),
            Some("Attic"),
            None,
        );
        assert_eq!(store.player_state().inventory, vec!["brass lantern"]);
        let scene = store.scene("Attic").expect("scene");
        assert_eq!(scene.current_items, vec!["rope"]);
        assert!(scene.scene_items.contains(&"brass lantern".to_string()));
    }

    #[test]
    fn drop_moves_item_back() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("Kitchen").with_inventory(["sword"]),
            None,
            None,
            None,
        );
        store.ingest(
            &EngineFacts::room("Kitchen").with_description("Dropped."),
            Some("drop the sword"),
            Some("Kitchen"),
            None,
        );
        assert!(store.player_state().inventory.is_empty());
        let scene = store.scene("Kitchen").expect("scene");
        assert_eq!(scene.current_items, vec!["sword"]);
        assert_eq!(scene.scene_items, vec!["sword"]);
    }

    #[test]
    fn ground_truth_suppresses_inference() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("Attic")
                .with_description("Taken.")
                .with_visible_items(["rope"]),
            Some("take knife"),
            None,
            None,
        );
        assert!(store.player_state().inventory.is_empty());
    }

    #[test]
    fn failed_take_changes_nothing() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("Attic").with_description("You can't see any such thing."),
            Some("take unicorn"),
            None,
            None,
        );
        assert!(store.player_state().inventory.is_empty());
    }

    #[test]
    fn action_feedback_separation() {
        let config = MemoryConfig {
            separate_action_feedback: true,
            ..MemoryConfig::default()
        };
        let mut store = SceneMemoryStore::new("Tester", config);
        store.ingest(
            &EngineFacts::room("West of House").with_description("An open field."),
            None,
            None,
            None,
        );
        store.ingest(
            &EngineFacts::room("West of House").with_description("The mailbox is closed."),
            Some("open door"),
            Some("West of House"),
            None,
        );
        store.ingest(
            &EngineFacts::room("West of House").with_description("A small mailbox is here."),
            Some("look"),
            Some("West of House"),
            None,
        );
        let scene = store.scene("West of House").expect("scene");
        assert_eq!(
            scene.description_lines,
            vec!["An open field.", "A small mailbox is here."]
        );
        assert_eq!(scene.action_records[0].result, "The mailbox is closed.");
    }

    #[test]
    fn narration_and_npcs_target_current_room() {
        let mut store = store();
        assert!(!store.append_narration(None, "Too early."));
        store.ingest(&EngineFacts::room("Cellar"), None, None, None);
        assert!(store.append_narration(None, "Darkness presses in."));
        assert!(!store.append_narration(None, "Darkness presses in."));
        assert!(!store.append_narration(Some("Nowhere"), "Lost line."));
        assert!(store.record_npc(None, "troll"));
        let snapshot = store.context_snapshot();
        assert_eq!(snapshot.world.all_npcs, vec!["troll"]);
        assert_eq!(
            snapshot.current_scene.expect("scene").narrations,
            vec!["Darkness presses in."]
        );
    }

    #[test]
    fn snapshot_aggregates_and_recency() {
        let mut store = store();
        for (room, previous) in [
            ("West of House", None),
            ("North of House", Some("West of House")),
            ("Behind House", Some("North of House")),
            ("Kitchen", Some("Behind House")),
        ] {
            store.ingest(
                &EngineFacts::room(room).with_visible_items([format!("{room} thing")]),
                Some("go"),
                previous,
                None,
            );
        }
        let snapshot = store.context_snapshot();
        assert_eq!(snapshot.status, ContextStatus::Ok);
        assert_eq!(snapshot.current_room.as_deref(), Some("Kitchen"));
        assert_eq!(snapshot.world.scene_count, 4);
        assert_eq!(snapshot.world.all_items.len(), 4);
        let recent: Vec<&str> = snapshot
            .recent_scene_summaries
            .iter()
            .map(|s| s.room_name.as_str())
            .collect();
        assert_eq!(recent, vec!["Behind House", "North of House"]);
    }

    #[test]
    fn reset_clears_memory_and_rows() {
        let repo = SqliteSceneRepository::open_in_memory(&PersistenceConfig::default())
            .expect("open");
        let mut store =
            SceneMemoryStore::with_repository("Tester", MemoryConfig::default(), Box::new(repo));
        store.ingest(&EngineFacts::room("Attic").with_inventory(["rope"]), None, None, None);
        store.reset();
        assert_eq!(store.turn_count(), 0);
        assert_eq!(store.scene_count(), 0);
        assert!(store.player_state().inventory.is_empty());
        assert_eq!(store.context_snapshot().status, ContextStatus::NoContext);
    }

    #[test]
    fn take_all_and_drop_all_leave_labels_alone() {
        let mut store = store();
        store.ingest(
            &EngineFacts::room("Attic").with_visible_items(["brass lantern", "leaflet"]),
            None,
            None,
            None,
        );
        store.ingest(
            &EngineFacts::room("Attic").with_description("brass lantern: Taken.\nleaflet: Taken."),
            Some("take all"),
            Some("Attic"),
            None,
        );
        assert!(store.player_state().inventory.is_empty());

        store.ingest(
            &EngineFacts::room("Attic")
                .with_description("brass lantern: Dropped.\nleaflet: Dropped."),
            Some("drop all"),
            Some("Attic"),
            None,
        );
        let scene = store.scene("Attic").expect("scene");
        assert!(store.player_state().inventory.is_empty());
        assert_eq!(scene.current_items, vec!["brass lantern".to_string(), "leaflet".to_string()]);
        assert!(!scene.scene_items.iter().any(|item| item == "all"));
        assert_eq!(scene.action_records.len(), 2);
        assert!(scene.action_records.iter().all(|r| r.target_item.is_none()));
    }

    /// Repository whose every write fails.
    struct BrokenDisk;

    impl SceneRepository for BrokenDisk {
        fn save_scene(&self, _room_key: &str, _scene: &Scene) -> crate::error::Result<()> {
            Err(crate::IfMemError::Config("disk full".into()))
        }
        fn load_scenes(&self) -> crate::error::Result<Vec<(String, Scene)>> {
            Ok(Vec::new())
        }
        fn save_player_state(&self, _state: &PlayerState) -> crate::error::Result<()> {
            Err(crate::IfMemError::Config("disk full".into()))
        }
        fn load_player_state(&self) -> crate::error::Result<Option<PlayerState>> {
            Ok(None)
        }
        fn clear(&self) -> crate::error::Result<()> {
            Err(crate::IfMemError::Config("disk full".into()))
        }
    }

    #[test]
    fn write_failures_keep_memory_authoritative() {
        let mut store =
            SceneMemoryStore::with_repository("Tester", MemoryConfig::default(), Box::new(BrokenDisk));
        store.ingest(
            &EngineFacts::room("Cellar").with_status(5, 3).with_inventory(["lamp"]),
            Some("down"),
            None,
            None,
        );
        assert_eq!(store.scene_count(), 1);
        assert_eq!(store.player_state().score, Some(5));
        assert!(store.append_narration(None, "Cold air rises."));
        assert_eq!(
            store.scene("Cellar").expect("scene").narrations,
            vec!["Cold air rises.".to_string()]
        );
        assert!(store.record_npc(None, "troll"));

        store.reset();
        assert_eq!(store.scene_count(), 0);
        assert_eq!(store.turn_count(), 0);
        assert!(store.player_state().inventory.is_empty());
    }

    #[test]
    fn room_keys_normalize() {
        assert_eq!(room_key("  West   of HOUSE "), "west of house");
    }
}
