//! Configuration for the ifmem companion layer.
//!
//! Maps directly to `ifmem.toml`. Every section is optional and falls back to
//! the defaults below, so an empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IfMemConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Scene memory behavior.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Write-through persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Narration prompt and response schema sources.
    #[serde(default)]
    pub narration: NarrationConfig,
}

impl IfMemConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `IfMemError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::IfMemError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Name the narrator uses for the player.
    #[serde(default = "default_player_name")]
    pub player_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            player_name: default_player_name(),
        }
    }
}

/// Scene memory tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// How many other recently visited scenes to summarize in a snapshot.
    #[serde(default = "default_2")]
    pub recent_scene_summaries: usize,
    /// Keep same-room action feedback ("The mailbox is closed.") out of
    /// `description_lines`. Look-style commands and room entries still merge.
    #[serde(default)]
    pub separate_action_feedback: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_scene_summaries: 2,
            separate_action_feedback: false,
        }
    }
}

/// `SQLite` write-through settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether scenes are persisted at all.
    #[serde(default)]
    pub enabled: bool,
    /// Database file path.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store a CRC-32 alongside every scene row.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            db_path: default_db_path(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

/// Where the narration prompt spec and response schema come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// JSON prompt spec path; the built-in v1 spec is used when unset.
    #[serde(default)]
    pub prompt_spec_path: Option<PathBuf>,
    /// JSON response schema path; the built-in schema is used when unset.
    #[serde(default)]
    pub response_schema_path: Option<PathBuf>,
    /// Trigger label recorded in narration job metadata.
    #[serde(default = "default_trigger")]
    pub trigger: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            prompt_spec_path: None,
            response_schema_path: None,
            trigger: default_trigger(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_2() -> usize {
    2
}
fn default_player_name() -> String {
    "Adventurer".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("ifmem_scenes.db")
}
fn default_trigger() -> String {
    "turn".to_string()
}
