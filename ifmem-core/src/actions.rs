//! Command classification: verb/target extraction and action categories.
//!
//! Fixed-prefix rules, not a grammar. Good enough for two-word parsers and
//! the occasional "put the lamp in the case".

use crate::scene::ActionCategory;

/// Prefixes that normalize to `take`. Longer prefixes first.
const TAKE_PREFIXES: &[&str] = &["pick up", "take", "get", "grab", "pick"];
/// Prefixes that normalize to `drop`.
const DROP_PREFIXES: &[&str] = &["drop", "leave", "put", "place", "remove"];
/// Tokens that start a destination clause.
const PREPOSITIONS: &[&str] = &[
    "in", "into", "on", "onto", "under", "from", "with", "to", "inside", "at", "behind", "off",
    "over",
];
const ARTICLES: &[&str] = &["the", "a", "an"];
const PARTICLES: &[&str] = &["up", "down"];
/// Targets that name no single object ("take all", "drop it").
const NON_ITEM_TARGETS: &[&str] = &["all", "everything", "it", "them"];

const ITEM_VERBS: &[&str] = &["take", "drop", "give", "throw", "wear", "eat", "drink"];
const ACQUIRE_VERBS: &[&str] = &["take", "get", "grab", "pick", "steal", "buy"];
const WORLD_OBJECT_VERBS: &[&str] = &[
    "open", "close", "read", "look", "examine", "inspect", "search",
];
const LOOK_VERBS: &[&str] = &["look", "examine", "inspect", "search"];

const ACQUIRE_MARKERS: &[&str] = &["taken", "already have", "got", "you now have", "picked up"];
const DROP_MARKERS: &[&str] = &["dropped", "placed", "left", "put down"];

/// A command split into a normalized verb and an optional direct object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIntent {
    /// Normalized verb.
    pub verb: String,
    /// Direct object, without articles or destination clause.
    pub target: Option<String>,
}

impl CommandIntent {
    /// Whether this is a `take`.
    #[must_use]
    pub fn is_acquire(&self) -> bool {
        self.verb == "take"
    }

    /// Whether this is a `drop`.
    #[must_use]
    pub fn is_drop(&self) -> bool {
        self.verb == "drop"
    }

    /// Whether the command re-describes the surroundings.
    #[must_use]
    pub fn is_look(&self) -> bool {
        LOOK_VERBS.contains(&self.verb.as_str())
    }
}

/// Split a raw command into verb and target.
#[must_use]
pub fn classify_command(command: &str) -> CommandIntent {
    let normalized = command
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if let Some(rest) = strip_any_prefix(&normalized, TAKE_PREFIXES) {
        return CommandIntent {
            verb: "take".to_string(),
            target: clean_target(rest, true),
        };
    }
    if let Some(rest) = strip_any_prefix(&normalized, DROP_PREFIXES) {
        return CommandIntent {
            verb: "drop".to_string(),
            target: clean_target(rest, true),
        };
    }

    let (head, rest) = normalized
        .split_once(' ')
        .unwrap_or((normalized.as_str(), ""));
    let verb = match head {
        "x" => "examine",
        "l" => "look",
        other => other,
    };
    CommandIntent {
        verb: verb.to_string(),
        target: clean_target(rest, false),
    }
}

/// Derive the action category for a classified command.
#[must_use]
pub fn derive_category(intent: &CommandIntent, room_changed: bool) -> ActionCategory {
    let verb = intent.verb.as_str();
    if room_changed {
        ActionCategory::Movement
    } else if ITEM_VERBS.contains(&verb)
        || (intent.target.is_some() && ACQUIRE_VERBS.contains(&verb))
    {
        ActionCategory::ItemInteraction
    } else if WORLD_OBJECT_VERBS.contains(&verb) {
        ActionCategory::WorldObjectInteraction
    } else {
        ActionCategory::GenericInteraction
    }
}

/// Whether the outcome text reports a successful pick-up.
#[must_use]
pub fn is_successful_acquire(result: &str) -> bool {
    contains_marker(result, ACQUIRE_MARKERS)
}

/// Whether the outcome text reports a successful drop.
#[must_use]
pub fn is_successful_drop(result: &str) -> bool {
    contains_marker(result, DROP_MARKERS)
}

fn contains_marker(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|marker| lower.contains(marker))
}

fn strip_any_prefix<'a>(text: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        if text == *prefix {
            Some("")
        } else {
            text.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(' '))
        }
    })
}

fn clean_target(rest: &str, strip_particles: bool) -> Option<String> {
    let mut words = rest.split(' ').filter(|w| !w.is_empty()).peekable();
    while let Some(word) = words.peek() {
        let skip = ARTICLES.contains(word) || (strip_particles && PARTICLES.contains(word));
        if !skip {
            break;
        }
        words.next();
    }
    let kept: Vec<&str> = words
        .take_while(|word| !PREPOSITIONS.contains(word))
        .filter(|word| !ARTICLES.contains(word))
        .collect();
    let target = kept.join(" ");
    if target.is_empty() || NON_ITEM_TARGETS.contains(&target.as_str()) {
        None
    } else {
        Some(target)
    }
}
