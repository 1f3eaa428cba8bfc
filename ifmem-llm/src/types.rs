//! Chat, job and response payload types.

use serde::{Deserialize, Serialize};

/// Chat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The rendered game context.
    User,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who speaks.
    pub role: Role,
    /// Message text.
    pub content: String,
}

/// Output of the prompt renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    /// System message text.
    pub system: String,
    /// User message text.
    pub user: String,
}

/// Diagnostics attached to a narration job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// What triggered the narration, e.g. `"turn"`.
    pub trigger: String,
    /// Store turn count at render time.
    pub turn_count: Option<u64>,
    /// Room at render time.
    pub room: Option<String>,
}

/// Everything a narrator backend needs for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationJob {
    /// System message then user message.
    pub messages: Vec<ChatMessage>,
    /// Diagnostics.
    pub metadata: JobMetadata,
}

impl NarrationJob {
    /// Wrap a rendered prompt.
    #[must_use]
    pub fn new(prompt: RenderedPrompt, metadata: JobMetadata) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: prompt.system,
                },
                ChatMessage {
                    role: Role::User,
                    content: prompt.user,
                },
            ],
            metadata,
        }
    }

    /// Text of the system message.
    #[must_use]
    pub fn system(&self) -> &str {
        self.content_of(Role::System)
    }

    /// Text of the user message.
    #[must_use]
    pub fn user(&self) -> &str {
        self.content_of(Role::User)
    }

    fn content_of(&self, role: Role) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map_or("", |m| m.content.as_str())
    }
}

/// Structured narrator response, read from a normalized payload.
///
/// Field names follow the response schema's hyphenated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationPayload {
    /// One entry per object: "object, room, actions".
    #[serde(rename = "game-last-objects")]
    pub game_last_objects: Vec<String>,
    /// Route the player has taken.
    #[serde(rename = "game-room-path")]
    pub game_room_path: String,
    /// One entry per change: "change, trigger".
    #[serde(rename = "game-last-changes")]
    pub game_last_changes: Vec<String>,
    /// What the player seems to be doing.
    #[serde(rename = "game-intent")]
    pub game_intent: String,
    /// What the player seems to be trying to achieve overall.
    #[serde(rename = "game-meta-intent")]
    pub game_meta_intent: String,
    /// Command the narrator would type next.
    #[serde(rename = "hidden-next-command")]
    pub hidden_next_command: String,
    /// Confidence in `hidden_next_command`, 0 to 100.
    #[serde(rename = "hidden-next-command-confidence")]
    pub hidden_next_command_confidence: i64,
    /// The narration text shown to the player.
    pub narration: String,
}

impl NarrationPayload {
    /// Read from a normalized object. Unknown keys are ignored.
    ///
    /// # Errors
    /// [`LlmError::ParseError`](crate::LlmError::ParseError) if a field has
    /// the wrong type, which normalization prevents.
    pub fn from_normalized(
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(object.clone()))?)
    }

    /// Payload used when the narrator fails.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            narration: "The game continues...".to_string(),
            game_intent: "Unknown".to_string(),
            game_meta_intent: "Unknown".to_string(),
            hidden_next_command: "look".to_string(),
            hidden_next_command_confidence: 0,
            ..Self::default()
        }
    }
}
