//! Prompt spec: versioned JSON configuration for the narration renderer.
//!
//! ```json
//! {
//!   "spec_version": "1.0",
//!   "limits": { "recent_actions": 3 },
//!   "value_sources": {
//!     "player_name": { "kind": "scalar", "path": "player_name" },
//!     "inventory":   { "kind": "list", "path": "player_state.inventory" },
//!     "actions":     { "kind": "list_of_objects", "path": "current_scene.action_records",
//!                      "take_last": "recent_actions", "template": "- {command}: {result}" }
//!   },
//!   "blocks": [
//!     { "derived_lines": [
//!         { "when_present": "inventory", "text": "{player_name} is carrying {inventory}." },
//!         { "text": "{player_name} is carrying nothing." }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Specs are validated eagerly on load. A spec that loads renders without
//! configuration errors; the only render-time failure is a record missing a
//! field its template needs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// The only supported `spec_version`.
pub const SUPPORTED_SPEC_VERSION: &str = "1.0";

/// Built-in narration spec, shipped with the crate.
const BUILTIN_NARRATION_SPEC: &str = include_str!("../prompts/narration_v1.json");

/// `{{`, `}}` or `{identifier}`.
pub(crate) static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
});

/// Placeholder names referenced by `template`, in order of appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Spec types
// ---------------------------------------------------------------------------

/// A complete prompt spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Must equal [`SUPPORTED_SPEC_VERSION`].
    pub spec_version: String,
    /// Named window sizes referenced by value sources.
    #[serde(default)]
    pub limits: BTreeMap<String, usize>,
    /// Named values read from the context.
    pub value_sources: BTreeMap<String, ValueSource>,
    /// Blocks rendered into the system message.
    #[serde(default)]
    pub system_blocks: Vec<Block>,
    /// Blocks rendered into the user message.
    pub blocks: Vec<Block>,
}

/// How one named value is read from the context and rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSource {
    /// A single field.
    Scalar(ScalarSource),
    /// A list of scalars.
    List(ListSource),
    /// A list of records, each rendered through a template.
    ListOfObjects(ObjectListSource),
}

/// `kind: "scalar"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarSource {
    /// Dotted path into the context.
    pub path: String,
    /// Truncate to this many characters and append `...`.
    #[serde(default)]
    pub max_chars: Option<WindowSize>,
    /// Rendered when the value is missing or null.
    #[serde(default)]
    pub fallback: String,
}

/// `kind: "list"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSource {
    /// Dotted path into the context.
    pub path: String,
    /// Which items to keep.
    #[serde(flatten)]
    pub window: Window,
    /// Per-item template; `{item}` is the item text.
    #[serde(default)]
    pub item_template: Option<String>,
    /// Join separator.
    #[serde(default = "default_list_separator")]
    pub separator: String,
}

/// `kind: "list_of_objects"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectListSource {
    /// Dotted path into the context.
    pub path: String,
    /// Which records to keep.
    #[serde(flatten)]
    pub window: Window,
    /// Record template; placeholders name record fields.
    pub template: String,
    /// Join separator.
    #[serde(default = "default_record_separator")]
    pub separator: String,
    /// Indent continuation lines of a multi-line record by this many spaces.
    #[serde(default)]
    pub indent: Option<usize>,
}

impl ValueSource {
    /// Dotted path this source reads.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Scalar(s) => &s.path,
            Self::List(s) => &s.path,
            Self::ListOfObjects(s) => &s.path,
        }
    }
}

/// Drop-then-take window over a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Window {
    /// Drop this many items from the front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_first: Option<WindowSize>,
    /// Drop this many items from the back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_last: Option<WindowSize>,
    /// Then keep at most this many from the front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_first: Option<WindowSize>,
    /// Then keep at most this many from the back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_last: Option<WindowSize>,
}

impl Window {
    fn sizes(&self) -> impl Iterator<Item = &WindowSize> {
        [
            &self.drop_first,
            &self.drop_last,
            &self.take_first,
            &self.take_last,
        ]
        .into_iter()
        .flatten()
    }
}

/// A literal count or the name of an entry in `limits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowSize {
    /// Literal count.
    Count(usize),
    /// Name of a `limits` entry.
    Limit(String),
}

impl WindowSize {
    /// Resolve against the `limits` table.
    ///
    /// # Errors
    /// [`LlmError::InvalidSpec`] for an unknown limit name.
    pub fn resolve(&self, limits: &BTreeMap<String, usize>) -> Result<usize> {
        match self {
            Self::Count(n) => Ok(*n),
            Self::Limit(name) => limits
                .get(name)
                .copied()
                .ok_or_else(|| LlmError::InvalidSpec(format!("unknown limit {name:?}"))),
        }
    }
}

/// One paragraph of output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    /// Label for diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Value sources that must all be present for the block to render.
    #[serde(default)]
    pub required: Vec<String>,
    /// Literal template lines.
    #[serde(default)]
    pub lines: Vec<String>,
    /// Conditional line; the first matching case is appended after `lines`.
    #[serde(default)]
    pub derived_lines: Vec<DerivedLine>,
}

/// One case of a conditional line. A case without a predicate always matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivedLine {
    /// Matches when this source's raw value is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_present: Option<String>,
    /// Matches when this source's raw value is empty or missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_empty: Option<String>,
    /// Matches when every listed source is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_all_present: Option<Vec<String>>,
    /// Template line emitted on match.
    pub text: String,
}

impl DerivedLine {
    fn predicate_count(&self) -> usize {
        usize::from(self.when_present.is_some())
            + usize::from(self.when_empty.is_some())
            + usize::from(self.when_all_present.is_some())
    }

    fn predicate_names(&self) -> impl Iterator<Item = &str> {
        self.when_present
            .iter()
            .chain(self.when_empty.iter())
            .chain(self.when_all_present.iter().flatten())
            .map(String::as_str)
    }
}

fn default_list_separator() -> String {
    ", ".to_string()
}
fn default_record_separator() -> String {
    "\n".to_string()
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl PromptSpec {
    /// Parse and validate a spec from JSON text.
    ///
    /// # Errors
    /// [`LlmError::ParseError`] for malformed JSON or missing fields, and the
    /// validation errors listed on [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read, parse and validate a spec file.
    ///
    /// # Errors
    /// [`LlmError::Io`] if the file cannot be read, else as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = spec.value_sources.len(),
            blocks = spec.blocks.len(),
            "Prompt spec loaded"
        );
        Ok(spec)
    }

    /// The built-in narration spec.
    ///
    /// # Errors
    /// Only if the shipped JSON is broken, which the test suite rules out.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_NARRATION_SPEC)
    }

    /// Check every structural rule.
    ///
    /// # Errors
    /// - [`LlmError::UnsupportedSpecVersion`] for any version but `"1.0"`
    /// - [`LlmError::InvalidSpec`] for empty paths or templates, unknown
    ///   limits, or derived cases with more than one predicate
    /// - [`LlmError::UndeclaredPlaceholder`] for placeholders, predicates or
    ///   `required` entries naming no value source
    pub fn validate(&self) -> Result<()> {
        if self.spec_version != SUPPORTED_SPEC_VERSION {
            return Err(LlmError::UnsupportedSpecVersion(self.spec_version.clone()));
        }

        for (name, source) in &self.value_sources {
            if source.path().trim().is_empty() {
                return Err(LlmError::InvalidSpec(format!(
                    "value source {name:?} has an empty path"
                )));
            }
            self.validate_source(name, source)?;
        }

        for (section, blocks) in [("system_blocks", &self.system_blocks), ("blocks", &self.blocks)] {
            for (index, block) in blocks.iter().enumerate() {
                self.validate_block(&format!("{section}[{index}]"), block)?;
            }
        }
        Ok(())
    }

    fn validate_source(&self, name: &str, source: &ValueSource) -> Result<()> {
        match source {
            ValueSource::Scalar(scalar) => {
                if let Some(size) = &scalar.max_chars {
                    size.resolve(&self.limits)?;
                }
            }
            ValueSource::List(list) => {
                for size in list.window.sizes() {
                    size.resolve(&self.limits)?;
                }
                if let Some(template) = &list.item_template {
                    if let Some(bad) = placeholders(template).into_iter().find(|p| *p != "item") {
                        return Err(LlmError::UndeclaredPlaceholder {
                            context: format!("value_sources.{name}.item_template"),
                            placeholder: bad.to_string(),
                        });
                    }
                }
            }
            ValueSource::ListOfObjects(objects) => {
                for size in objects.window.sizes() {
                    size.resolve(&self.limits)?;
                }
                if objects.template.trim().is_empty() {
                    return Err(LlmError::InvalidSpec(format!(
                        "value source {name:?} has an empty template"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_block(&self, context: &str, block: &Block) -> Result<()> {
        for name in &block.required {
            self.check_declared(&format!("{context}.required"), name)?;
        }
        for (index, line) in block.lines.iter().enumerate() {
            self.check_template(&format!("{context}.lines[{index}]"), line)?;
        }
        for (index, case) in block.derived_lines.iter().enumerate() {
            let case_context = format!("{context}.derived_lines[{index}]");
            if case.predicate_count() > 1 {
                return Err(LlmError::InvalidSpec(format!(
                    "{case_context} has more than one predicate"
                )));
            }
            for name in case.predicate_names() {
                self.check_declared(&case_context, name)?;
            }
            self.check_template(&case_context, &case.text)?;
        }
        Ok(())
    }

    fn check_template(&self, context: &str, template: &str) -> Result<()> {
        for name in placeholders(template) {
            self.check_declared(context, name)?;
        }
        Ok(())
    }

    fn check_declared(&self, context: &str, name: &str) -> Result<()> {
        if self.value_sources.contains_key(name) {
            Ok(())
        } else {
            Err(LlmError::UndeclaredPlaceholder {
                context: context.to_string(),
                placeholder: name.to_string(),
            })
        }
    }

    /// Value source names used by any block, for diagnostics.
    #[must_use]
    pub fn referenced_sources(&self) -> BTreeSet<&str> {
        self.system_blocks
            .iter()
            .chain(&self.blocks)
            .flat_map(|block| {
                block
                    .lines
                    .iter()
                    .flat_map(|line| placeholders(line))
                    .chain(block.derived_lines.iter().flat_map(|case| {
                        placeholders(&case.text)
                            .into_iter()
                            .chain(case.predicate_names())
                    }))
                    .chain(block.required.iter().map(String::as_str))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
