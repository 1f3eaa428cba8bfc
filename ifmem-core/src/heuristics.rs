//! Transcript heuristics: raw engine text → [`EngineFacts`].
//!
//! The parser is an ordered pipeline of small pure stages:
//!
//! 1. [`find_header_line`]: the first line carrying both `Score:` and `Moves:`
//! 2. [`extract_room_name`] / [`extract_description`]: only when a header exists
//! 3. [`extract_score`] / [`extract_moves`]: anywhere in the transcript
//! 4. [`extract_inventory`]: `You are carrying:` / `You have:` listings
//! 5. [`extract_visible_items`]: `There is ...` / `You see ...` sentences
//! 6. [`extract_exception_message`]: only when no header exists
//!
//! The rules are tuned for Infocom-style status headers and are deliberately
//! approximate. The pipeline is total: every input yields facts, and
//! anything without a header is classified as an engine exception.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{EngineFacts, PlayerStateSnapshot};

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Score:\s*(\d+)").expect("valid regex"));
static MOVES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Moves:\s*(\d+)").expect("valid regex"));
static INVENTORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)You (?:are carrying|have):\s*(.+?)(?:\n[ \t]*\n|\z)").expect("valid regex")
});
static THERE_IS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bThere (?:is|are)\s+(.+?)(?:\.|\z)").expect("valid regex")
});
static YOU_SEE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bYou (?:can )?see\s+(.+?)(?:\.|\z)").expect("valid regex")
});
static ITEM_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",|\band\b").expect("valid regex"));
static INVENTORY_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\n]").expect("valid regex"));

/// Parse a raw engine transcript into structured facts.
///
/// Never fails. Header detection always wins over exception detection.
#[must_use]
pub fn parse_engine_facts(transcript: &str) -> EngineFacts {
    let normalized = transcript.replace("\r\n", "\n");

    let mut facts = EngineFacts {
        player_state: PlayerStateSnapshot {
            inventory: extract_inventory(&normalized),
            score: extract_score(&normalized),
            moves: extract_moves(&normalized),
        },
        visible_items: extract_visible_items(&normalized),
        ..EngineFacts::default()
    };

    match find_header_line(&normalized) {
        Some((index, header)) => {
            let room_name = extract_room_name(header);
            facts.description = extract_description(&normalized, index, room_name.as_deref());
            facts.room_name = room_name;
        }
        None => {
            facts.is_exception = true;
            facts.exception_message = extract_exception_message(&normalized);
        }
    }

    facts
}

/// Locate the status header: the first line containing both `Score:` and
/// `Moves:`. Returns the line index and the trimmed line.
#[must_use]
pub fn find_header_line(transcript: &str) -> Option<(usize, &str)> {
    transcript
        .lines()
        .enumerate()
        .find(|(_, line)| line.contains("Score:") && line.contains("Moves:"))
        .map(|(index, line)| (index, line.trim()))
}

/// Room name: header text before `Score:`, trimmed. Blank names are absent.
#[must_use]
pub fn extract_room_name(header_line: &str) -> Option<String> {
    let name = header_line
        .split_once("Score:")
        .map_or(header_line, |(before, _)| before)
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Description: every line after the header, with leading and trailing blank
/// lines removed and a leading line repeating the room name dropped.
///
/// `None` when nothing is left ("no new content").
#[must_use]
pub fn extract_description(
    transcript: &str,
    header_index: usize,
    room_name: Option<&str>,
) -> Option<String> {
    let mut lines: Vec<&str> = transcript
        .lines()
        .skip(header_index + 1)
        .map(str::trim_end)
        .collect();

    trim_blank_edges(&mut lines);
    if let (Some(first), Some(room)) = (lines.first(), room_name) {
        if first.trim() == room {
            lines.remove(0);
            trim_blank_edges(&mut lines);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Transcript text after the header line, trimmed. `None` without a header or
/// when the body is blank.
#[must_use]
pub fn body_after_header(transcript: &str) -> Option<String> {
    let normalized = transcript.replace("\r\n", "\n");
    let (index, _) = find_header_line(&normalized)?;
    let body = normalized
        .lines()
        .skip(index + 1)
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// First `Score: N` anywhere in the transcript.
#[must_use]
pub fn extract_score(transcript: &str) -> Option<u32> {
    first_number(&SCORE_RE, transcript)
}

/// First `Moves: N` anywhere in the transcript.
#[must_use]
pub fn extract_moves(transcript: &str) -> Option<u32> {
    first_number(&MOVES_RE, transcript)
}

/// Inventory listing up to the next blank line, split on commas and newlines.
#[must_use]
pub fn extract_inventory(transcript: &str) -> Option<Vec<String>> {
    let captured = INVENTORY_RE.captures(transcript)?.get(1)?.as_str();
    let items: Vec<String> = INVENTORY_SPLIT_RE
        .split(captured)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

/// Items named in "There is/are ..." and "You (can) see ..." sentences.
///
/// Fragments are split on commas and "and"; anything starting with "no " is
/// a negative mention and is skipped. No items at all yields `None`.
#[must_use]
pub fn extract_visible_items(transcript: &str) -> Option<Vec<String>> {
    let mut collected = Vec::new();
    for pattern in [&*THERE_IS_RE, &*YOU_SEE_RE] {
        for captures in pattern.captures_iter(transcript) {
            let Some(sentence) = captures.get(1) else {
                continue;
            };
            for fragment in ITEM_SPLIT_RE.split(sentence.as_str()) {
                let candidate = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
                if candidate.is_empty() || candidate.to_lowercase().starts_with("no ") {
                    continue;
                }
                collected.push(candidate);
            }
        }
    }
    if collected.is_empty() {
        None
    } else {
        Some(collected)
    }
}

/// The first line that starts with an uppercase letter and contains a space.
#[must_use]
pub fn extract_exception_message(transcript: &str) -> Option<String> {
    transcript
        .lines()
        .map(str::trim)
        .find(|line| {
            line.chars().next().is_some_and(char::is_uppercase) && line.contains(' ')
        })
        .map(str::to_string)
}

fn first_number(pattern: &Regex, transcript: &str) -> Option<u32> {
    pattern
        .captures(transcript)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn trim_blank_edges(lines: &mut Vec<&str>) {
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}
