//! Prompt renderer: context JSON + [`PromptSpec`] → system/user messages.
//!
//! Values are read once per render. Conditional lines test the raw value at
//! the source's path (before windowing or formatting), so an empty list
//! selects the "nothing here" phrasing even when its rendered form would be
//! an empty string anyway.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LlmError, Result};
use crate::spec::{
    Block, DerivedLine, ListSource, ObjectListSource, PLACEHOLDER_RE, PromptSpec, ScalarSource,
    ValueSource, Window,
};
use crate::types::{JobMetadata, NarrationJob, RenderedPrompt};

/// Render both messages for `context`.
///
/// # Errors
/// [`LlmError::MissingTemplateField`] when a `list_of_objects` record lacks
/// a field its template references.
pub fn render(context: &Value, spec: &PromptSpec) -> Result<RenderedPrompt> {
    let values = ResolvedValues::resolve(context, spec)?;
    let system = render_blocks(&spec.system_blocks, &values);
    let user = render_blocks(&spec.blocks, &values);
    tracing::debug!(
        system_chars = system.len(),
        user_chars = user.len(),
        "Prompt rendered"
    );
    Ok(RenderedPrompt { system, user })
}

/// Render a narration job: both messages plus metadata read from the
/// context (`turn_count`, `current_room`).
///
/// # Errors
/// As [`render`].
pub fn build_narration_job(context: &Value, spec: &PromptSpec, trigger: &str) -> Result<NarrationJob> {
    let rendered = render(context, spec)?;
    let metadata = JobMetadata {
        trigger: trigger.to_string(),
        turn_count: lookup(context, "turn_count").and_then(Value::as_u64),
        room: lookup(context, "current_room")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    Ok(NarrationJob::new(rendered, metadata))
}

// ---------------------------------------------------------------------------
// Value resolution
// ---------------------------------------------------------------------------

/// Raw and rendered form of every value source for one render.
struct ResolvedValues<'a> {
    raw: HashMap<&'a str, Option<&'a Value>>,
    rendered: HashMap<&'a str, String>,
}

impl<'a> ResolvedValues<'a> {
    fn resolve(context: &'a Value, spec: &'a PromptSpec) -> Result<Self> {
        let mut raw = HashMap::with_capacity(spec.value_sources.len());
        let mut rendered = HashMap::with_capacity(spec.value_sources.len());
        for (name, source) in &spec.value_sources {
            let value = lookup(context, source.path());
            let text = match source {
                ValueSource::Scalar(s) => render_scalar(value, s, spec)?,
                ValueSource::List(s) => render_list(value, s, spec)?,
                ValueSource::ListOfObjects(s) => render_objects(name, value, s, spec)?,
            };
            raw.insert(name.as_str(), value);
            rendered.insert(name.as_str(), text);
        }
        Ok(Self { raw, rendered })
    }

    fn is_present(&self, name: &str) -> bool {
        self.raw.get(name).copied().flatten().is_some_and(is_present)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.rendered.get(name).map(String::as_str)
    }
}

/// Follow a dotted path. Numeric segments index into arrays.
#[must_use]
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Presence as seen by predicates: null, blank strings and empty containers
/// are empty; numbers and booleans are present.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Plain-text form of a JSON value.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn render_scalar(value: Option<&Value>, source: &ScalarSource, spec: &PromptSpec) -> Result<String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(source.fallback.clone());
    };
    let text = value_text(value);
    let Some(limit) = &source.max_chars else {
        return Ok(text);
    };
    let limit = limit.resolve(&spec.limits)?;
    if text.chars().count() <= limit {
        return Ok(text);
    }
    let cut: String = text.chars().take(limit).collect();
    Ok(format!("{}...", cut.trim_end()))
}

fn render_list(value: Option<&Value>, source: &ListSource, spec: &PromptSpec) -> Result<String> {
    let items = as_items(value);
    let items = apply_window(items, &source.window, spec)?;

    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let text = value_text(item);
        if !seen.contains(&text) {
            seen.push(text);
        }
    }

    let rendered: Vec<String> = match &source.item_template {
        Some(template) => seen
            .iter()
            .map(|item| {
                fill_template(template, |name| (name == "item").then(|| item.clone()))
            })
            .collect(),
        None => seen,
    };
    Ok(rendered.join(&source.separator))
}

fn render_objects(
    name: &str,
    value: Option<&Value>,
    source: &ObjectListSource,
    spec: &PromptSpec,
) -> Result<String> {
    let records = apply_window(as_items(value), &source.window, spec)?;
    let mut rendered = Vec::with_capacity(records.len());

    for record in records {
        let mut missing = None;
        let text = fill_template(&source.template, |field| {
            match record.get(field) {
                Some(v) => Some(value_text(v)),
                None => {
                    missing.get_or_insert_with(|| field.to_string());
                    Some(String::new())
                }
            }
        });
        if let Some(field) = missing {
            return Err(LlmError::MissingTemplateField {
                value_source: name.to_string(),
                field,
            });
        }
        rendered.push(match source.indent {
            Some(width) => indent_continuation(&text, width),
            None => text,
        });
    }
    Ok(rendered.join(&source.separator))
}

fn as_items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Drop first/last, then take first/last.
fn apply_window<'v>(mut items: Vec<&'v Value>, window: &Window, spec: &PromptSpec) -> Result<Vec<&'v Value>> {
    if let Some(n) = &window.drop_first {
        let n = n.resolve(&spec.limits)?.min(items.len());
        items.drain(..n);
    }
    if let Some(n) = &window.drop_last {
        let n = n.resolve(&spec.limits)?;
        items.truncate(items.len().saturating_sub(n));
    }
    if let Some(n) = &window.take_first {
        items.truncate(n.resolve(&spec.limits)?);
    }
    if let Some(n) = &window.take_last {
        let n = n.resolve(&spec.limits)?;
        let skip = items.len().saturating_sub(n);
        items.drain(..skip);
    }
    Ok(items)
}

fn indent_continuation(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&pad);
        }
        out.push_str(line);
    }
    out
}

/// Replace `{name}` placeholders through `lookup`; `{{`/`}}` become literal
/// braces. Placeholders `lookup` does not know are left as written.
fn fill_template(template: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| match caps.get(1) {
            Some(name) => lookup(name.as_str()).unwrap_or_else(|| caps[0].to_string()),
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

fn render_blocks(blocks: &[Block], values: &ResolvedValues<'_>) -> String {
    let rendered: Vec<String> = blocks
        .iter()
        .filter_map(|block| render_block(block, values))
        .collect();
    collapse_blank_lines(&rendered.join("\n\n"))
}

fn render_block(block: &Block, values: &ResolvedValues<'_>) -> Option<String> {
    if !block.required.iter().all(|name| values.is_present(name)) {
        return None;
    }

    let mut lines: Vec<String> = block
        .lines
        .iter()
        .map(|line| fill_line(line, values))
        .collect();
    if let Some(case) = block.derived_lines.iter().find(|case| case_matches(case, values)) {
        lines.push(fill_line(&case.text, values));
    }

    if lines.iter().all(|line| line.trim().is_empty()) {
        if let Some(name) = &block.name {
            tracing::trace!(block = %name, "Block rendered blank, dropped");
        }
        return None;
    }
    Some(lines.join("\n"))
}

fn case_matches(case: &DerivedLine, values: &ResolvedValues<'_>) -> bool {
    if let Some(name) = &case.when_present {
        return values.is_present(name);
    }
    if let Some(name) = &case.when_empty {
        return !values.is_present(name);
    }
    if let Some(names) = &case.when_all_present {
        return names.iter().all(|name| values.is_present(name));
    }
    true
}

fn fill_line(line: &str, values: &ResolvedValues<'_>) -> String {
    fill_template(line, |name| values.text(name).map(str::to_string))
}

/// Collapse runs of blank lines to one and trim blank edges.
fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() && out.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|last| last.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(json: Value) -> PromptSpec {
        PromptSpec::from_json_str(&json.to_string()).expect("valid spec")
    }

    fn user(context: &Value, spec: &PromptSpec) -> String {
        render(context, spec).expect("render").user
    }

    #[test]
    fn when_empty_selects_nothing_phrase_for_empty_or_missing_inventory() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "name": { "kind": "scalar", "path": "player_name" },
                "inventory": { "kind": "list", "path": "player_state.inventory" }
            },
            "blocks": [ { "derived_lines": [
                { "when_empty": "inventory", "text": "{name} is carrying nothing." },
                { "text": "{name} is carrying {inventory}." }
            ] } ]
        }));
        let empty = json!({ "player_name": "Ava", "player_state": { "inventory": [] } });
        assert_eq!(user(&empty, &spec), "Ava is carrying nothing.");
        let missing = json!({ "player_name": "Ava", "player_state": {} });
        assert_eq!(user(&missing, &spec), "Ava is carrying nothing.");
        let full = json!({ "player_name": "Ava", "player_state": { "inventory": ["lamp", "sword"] } });
        assert_eq!(user(&full, &spec), "Ava is carrying lamp, sword.");
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let ctx = json!({ "a": { "b": [ { "c": 1 } ] } });
        assert_eq!(lookup(&ctx, "a.b.0.c"), Some(&json!(1)));
        assert!(lookup(&ctx, "a.x").is_none());
        assert!(lookup(&ctx, "a.b.c").is_none());
    }

    #[test]
    fn presence_rules() {
        assert!(!is_present(&json!(null)));
        assert!(!is_present(&json!("  ")));
        assert!(!is_present(&json!([])));
        assert!(!is_present(&json!({})));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!("x")));
    }

    #[test]
    fn scalar_truncation_and_fallback() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "desc": { "kind": "scalar", "path": "d", "max_chars": 10 },
                "room": { "kind": "scalar", "path": "r", "fallback": "somewhere" }
            },
            "blocks": [ { "lines": ["{desc}|{room}"] } ]
        }));
        assert_eq!(
            user(&json!({ "d": "A long and winding road" }), &spec),
            "A long and...|somewhere"
        );
        assert_eq!(user(&json!({ "d": "Short", "r": "Attic" }), &spec), "Short|Attic");
    }

    #[test]
    fn list_window_drop_before_take_and_dedupe() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "limits": { "two": 2 },
            "value_sources": {
                "xs": { "kind": "list", "path": "xs", "drop_first": 1, "take_last": "two",
                        "item_template": "<{item}>", "separator": " " }
            },
            "blocks": [ { "lines": ["{xs}"] } ]
        }));
        assert_eq!(user(&json!({ "xs": ["a", "b", "c", "c"] }), &spec), "<c>");
        assert_eq!(user(&json!({ "xs": ["a", "b", "c", "d"] }), &spec), "<c> <d>");
        assert_eq!(user(&json!({ "xs": [1, true, "z"] }), &spec), "<true> <z>");
    }

    #[test]
    fn objects_render_through_template_with_indent() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "acts": { "kind": "list_of_objects", "path": "acts", "take_last": 2,
                          "template": "- {command}:\n{result}", "indent": 2 }
            },
            "blocks": [ { "lines": ["{acts}"] } ]
        }));
        let ctx = json!({ "acts": [
            { "command": "n", "result": "x" },
            { "command": "open mailbox", "result": "Opened." },
            { "command": "take leaflet", "result": "Taken." }
        ]});
        assert_eq!(
            user(&ctx, &spec),
            "- open mailbox:\n  Opened.\n- take leaflet:\n  Taken."
        );
    }

    #[test]
    fn missing_record_field_fails_fast() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "acts": { "kind": "list_of_objects", "path": "acts", "template": "{command} {oops}" }
            },
            "blocks": [ { "lines": ["{acts}"] } ]
        }));
        let err = render(&json!({ "acts": [ { "command": "n" } ] }), &spec).expect_err("must fail");
        match err {
            LlmError::MissingTemplateField { value_source, field } => {
                assert_eq!(value_source, "acts");
                assert_eq!(field, "oops");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn derived_lines_use_raw_values() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "name": { "kind": "scalar", "path": "player_name" },
                "inv": { "kind": "list", "path": "inventory" }
            },
            "blocks": [ { "derived_lines": [
                { "when_present": "inv", "text": "{name} is carrying {inv}." },
                { "text": "{name} is carrying nothing." }
            ] } ]
        }));
        assert_eq!(
            user(&json!({ "player_name": "Tester", "inventory": [] }), &spec),
            "Tester is carrying nothing."
        );
        assert_eq!(
            user(&json!({ "player_name": "Tester", "inventory": ["lamp", "sword"] }), &spec),
            "Tester is carrying lamp, sword."
        );
    }

    #[test]
    fn when_all_present_and_required() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": {
                "a": { "kind": "scalar", "path": "a" },
                "b": { "kind": "scalar", "path": "b" }
            },
            "blocks": [
                { "required": ["a"], "lines": ["A={a}"] },
                { "derived_lines": [
                    { "when_all_present": ["a", "b"], "text": "both" },
                    { "when_empty": "b", "text": "no b" }
                ] }
            ]
        }));
        assert_eq!(user(&json!({ "a": 1, "b": 2 }), &spec), "A=1\n\nboth");
        assert_eq!(user(&json!({ "b": "" }), &spec), "no b");
    }

    #[test]
    fn blank_blocks_drop_and_blank_runs_collapse() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": { "x": { "kind": "scalar", "path": "x" } },
            "blocks": [
                { "lines": ["", "first", "", "", ""] },
                { "lines": ["{x}", "  "] },
                { "lines": ["last {{literal}}"] }
            ]
        }));
        assert_eq!(user(&json!({}), &spec), "first\n\nlast {literal}");
    }

    #[test]
    fn system_blocks_render_separately() {
        let spec = spec(json!({
            "spec_version": "1.0",
            "value_sources": { "name": { "kind": "scalar", "path": "player_name" } },
            "system_blocks": [ { "lines": ["You narrate for {name}."] } ],
            "blocks": [ { "lines": ["Go."] } ]
        }));
        let rendered = render(&json!({ "player_name": "Tester" }), &spec).expect("render");
        assert_eq!(rendered.system, "You narrate for Tester.");
        assert_eq!(rendered.user, "Go.");
    }

    #[test]
    fn job_metadata_comes_from_context() {
        let spec = PromptSpec::builtin().expect("builtin");
        let ctx = json!({ "status": "ok", "player_name": "Tester", "turn_count": 4,
                          "current_room": "Attic", "player_state": { "inventory": [] } });
        let job = build_narration_job(&ctx, &spec, "turn").expect("job");
        assert_eq!(job.metadata.trigger, "turn");
        assert_eq!(job.metadata.turn_count, Some(4));
        assert_eq!(job.metadata.room.as_deref(), Some("Attic"));
        assert_eq!(job.messages.len(), 2);
    }
}
