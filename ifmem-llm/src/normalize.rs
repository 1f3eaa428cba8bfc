//! Payload normalizer: coerce a raw LLM payload to a JSON-schema shape.
//!
//! Never fails. Every declared property ends up present with its declared
//! type; anything that cannot be coerced is logged and replaced with a typed
//! empty value. Keys the schema does not declare pass through untouched.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::error::Result;

const BUILTIN_RESPONSE_SCHEMA: &str = include_str!("../prompts/narration_response_schema.json");

/// Raw replies that are not JSON are kept as narration, cut to this length.
pub const MAX_PLAIN_REPLY_CHARS: usize = 500;

static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
});

/// The built-in narration response schema.
///
/// # Errors
/// Only if the shipped JSON is broken, which the test suite rules out.
pub fn builtin_response_schema() -> Result<Value> {
    Ok(serde_json::from_str(BUILTIN_RESPONSE_SCHEMA)?)
}

/// Load a response schema from a JSON file.
///
/// # Errors
/// [`LlmError::Io`](crate::LlmError::Io) or
/// [`LlmError::ParseError`](crate::LlmError::ParseError).
pub fn load_schema(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let schema: Value = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "Response schema loaded");
    Ok(schema)
}

/// Turn a narrator's raw text reply into a payload candidate.
///
/// Tries the whole reply as JSON, then the first fenced JSON object, and
/// finally keeps the text itself as `narration`. Returns `None` for a blank
/// reply.
#[must_use]
pub fn parse_reply(reply: &str) -> Option<Value> {
    let reply = reply.trim();
    if reply.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(reply) {
        return Some(value);
    }
    if let Some(value) = FENCED_JSON_RE
        .captures(reply)
        .and_then(|caps| serde_json::from_str::<Value>(&caps[1]).ok())
    {
        return Some(value);
    }
    debug!(chars = reply.len(), "Narrator reply was not JSON, keeping it as narration");
    let text: String = reply.chars().take(MAX_PLAIN_REPLY_CHARS).collect();
    let mut object = Map::new();
    object.insert("narration".to_string(), Value::String(text));
    Some(Value::Object(object))
}

/// Normalize `payload` against `schema`.
#[must_use]
pub fn normalize(payload: Option<&Value>, schema: &Value) -> Map<String, Value> {
    let empty = Map::new();
    let payload = match payload {
        Some(Value::Object(map)) => map,
        None => &empty,
        Some(other) => {
            warn!(kind = json_kind(other), "LLM payload was not an object, treating as empty");
            &empty
        }
    };

    let mut normalized = Map::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, definition) in properties {
            let declared = declared_type(definition);
            let value = match payload.get(key).filter(|v| !v.is_null()) {
                Some(value) => coerce(key, value, declared),
                None => definition
                    .get("default")
                    .filter(|d| !d.is_null())
                    .cloned()
                    .unwrap_or_else(|| empty_value(declared)),
            };
            normalized.insert(key.clone(), value);
        }
    }

    let missing: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|field| normalized.get(*field).is_none_or(is_falsy))
        .collect();
    if !missing.is_empty() {
        warn!(fields = ?missing, "LLM payload missing required fields");
    }

    for (key, value) in payload {
        if !normalized.contains_key(key) {
            normalized.insert(key.clone(), value.clone());
        }
    }
    normalized
}

/// Declared type name; a union uses its first non-null member.
fn declared_type(definition: &Value) -> Option<&str> {
    match definition.get("type")? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(members) => members
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null"),
        _ => None,
    }
}

fn empty_value(declared: Option<&str>) -> Value {
    match declared {
        Some("string") => Value::String(String::new()),
        Some("integer" | "number") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => Value::Object(Map::new()),
        _ => Value::Null,
    }
}

/// Falsy for the required-field check; `false` itself counts as set.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) => false,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn coerce(key: &str, value: &Value, declared: Option<&str>) -> Value {
    match declared {
        Some("string") => Value::String(match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }),
        Some("integer") => to_integer(value).unwrap_or_else(|| {
            warn!(field = key, value = %value, "Failed to coerce LLM payload field to integer");
            Value::from(0)
        }),
        Some("number") => to_number(value).unwrap_or_else(|| {
            warn!(field = key, value = %value, "Failed to coerce LLM payload field to number");
            Value::from(0)
        }),
        Some("boolean") => Value::Bool(to_boolean(value)),
        Some("array") => {
            if value.is_array() {
                value.clone()
            } else {
                warn!(field = key, kind = json_kind(value), "Expected array in LLM payload");
                Value::Array(Vec::new())
            }
        }
        Some("object") => {
            if value.is_object() {
                value.clone()
            } else {
                warn!(field = key, kind = json_kind(value), "Expected object in LLM payload");
                Value::Object(Map::new())
            }
        }
        _ => value.clone(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(|f| Value::from(f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().map(Value::from).or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| Value::from(f.trunc() as i64))
            })
        }
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_boolean(value: &Value) -> bool {
    let text = match value {
        Value::Bool(b) => return *b,
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    matches!(text.as_str(), "true" | "1" | "yes")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "narration": { "type": "string" },
                "count": { "type": "integer" },
                "ratio": { "type": "number" },
                "flag": { "type": "boolean" },
                "tags": { "type": "array" },
                "meta": { "type": "object" },
                "mood": { "type": ["string", "null"], "default": "calm" },
                "anything": {}
            },
            "required": ["narration", "flag"]
        })
    }

    #[test]
    fn absent_fields_get_defaults_or_empties() {
        let out = normalize(None, &schema());
        assert_eq!(out["narration"], json!(""));
        assert_eq!(out["count"], json!(0));
        assert_eq!(out["ratio"], json!(0));
        assert_eq!(out["flag"], json!(false));
        assert_eq!(out["tags"], json!([]));
        assert_eq!(out["meta"], json!({}));
        assert_eq!(out["mood"], json!("calm"));
        assert_eq!(out["anything"], Value::Null);
    }

    #[test]
    fn null_counts_as_absent() {
        let out = normalize(Some(&json!({ "mood": null, "tags": null })), &schema());
        assert_eq!(out["mood"], json!("calm"));
        assert_eq!(out["tags"], json!([]));
    }

    #[test]
    fn coercions() {
        let payload = json!({
            "narration": 42,
            "count": "7",
            "ratio": "2.5",
            "flag": "Yes",
            "tags": "not a list",
            "meta": [1],
            "mood": 3
        });
        let out = normalize(Some(&payload), &schema());
        assert_eq!(out["narration"], json!("42"));
        assert_eq!(out["count"], json!(7));
        assert_eq!(out["ratio"], json!(2.5));
        assert_eq!(out["flag"], json!(true));
        assert_eq!(out["tags"], json!([]));
        assert_eq!(out["meta"], json!({}));
        assert_eq!(out["mood"], json!("3"));
    }

    #[test]
    fn integer_edge_cases() {
        let out = normalize(Some(&json!({ "count": 3.9 })), &schema());
        assert_eq!(out["count"], json!(3));
        let out = normalize(Some(&json!({ "count": "4.7" })), &schema());
        assert_eq!(out["count"], json!(4));
        let out = normalize(Some(&json!({ "count": true })), &schema());
        assert_eq!(out["count"], json!(1));
        let out = normalize(Some(&json!({ "count": "many" })), &schema());
        assert_eq!(out["count"], json!(0));
        let out = normalize(Some(&json!({ "count": [1] })), &schema());
        assert_eq!(out["count"], json!(0));
    }

    #[test]
    fn boolean_string_forms() {
        for (input, expected) in [
            (json!("TRUE"), true),
            (json!("1"), true),
            (json!(1), true),
            (json!("no"), false),
            (json!(0), false),
            (json!(false), false),
        ] {
            let out = normalize(Some(&json!({ "flag": input })), &schema());
            assert_eq!(out["flag"], json!(expected));
        }
    }

    #[test]
    fn containers_stringify_compactly() {
        let out = normalize(Some(&json!({ "narration": { "a": [1, 2] } })), &schema());
        assert_eq!(out["narration"], json!(r#"{"a":[1,2]}"#));
    }

    #[test]
    fn unknown_keys_pass_through_and_non_objects_are_empty() {
        let out = normalize(Some(&json!({ "narration": "x", "extra": [1] })), &schema());
        assert_eq!(out["extra"], json!([1]));

        let out = normalize(Some(&json!(["not", "an", "object"])), &schema());
        assert_eq!(out["narration"], json!(""));
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn reply_parsing_falls_back_in_order() {
        assert_eq!(parse_reply(r#"{"narration":"A"}"#), Some(json!({ "narration": "A" })));
        assert_eq!(
            parse_reply("Sure!\n```json\n{\"narration\": \"B\"}\n```\nDone."),
            Some(json!({ "narration": "B" }))
        );
        assert_eq!(
            parse_reply("The wind howls."),
            Some(json!({ "narration": "The wind howls." }))
        );
        assert_eq!(parse_reply("   "), None);

        let long = "x".repeat(MAX_PLAIN_REPLY_CHARS + 20);
        let parsed = parse_reply(&long).expect("plain text kept");
        assert_eq!(
            parsed["narration"].as_str().map(str::len),
            Some(MAX_PLAIN_REPLY_CHARS)
        );
    }

    #[test]
    fn builtin_schema_covers_payload_fields() {
        let schema = builtin_response_schema().expect("schema");
        let out = normalize(Some(&json!({ "narration": "Hi." })), &schema);
        for key in [
            "game-last-objects",
            "game-room-path",
            "game-last-changes",
            "game-intent",
            "game-meta-intent",
            "hidden-next-command",
            "hidden-next-command-confidence",
            "narration",
        ] {
            assert!(out.contains_key(key), "missing {key}");
        }
        assert_eq!(out["hidden-next-command-confidence"], json!(0));
    }
}
