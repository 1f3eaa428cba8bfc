//! Turn pipeline: transcript → scene memory → narration prompt → payload.
//!
//! One command is fully resolved before the next is accepted. The store is
//! locked for the whole turn, so memory is always updated before narration
//! is requested and a narration always lands in the scene it describes.

use ifmem_core::heuristics::body_after_header;
use ifmem_core::{
    ContextView, EngineFacts, IfMemConfig, SceneMemoryStore, SqliteSceneRepository, TurnHints,
    parse_engine_facts,
};
use ifmem_llm::normalize::load_schema;
use ifmem_llm::{
    LlmError, NarrationJob, NarrationPayload, PromptSpec, build_narration_job,
    builtin_response_schema, normalize, parse_reply,
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::status::StatusLine;

/// Default trigger label for narration jobs.
pub const DEFAULT_TRIGGER: &str = "turn";

// ---------------------------------------------------------------------------
// Narrator seam
// ---------------------------------------------------------------------------

/// The external LLM client.
///
/// Implementations send the job's messages to a model and return its raw
/// reply text. Errors are logged by the session and replaced with the
/// fallback payload; they never end the game.
pub trait Narrator {
    /// Produce a raw reply for `job`.
    ///
    /// # Errors
    /// Any [`LlmError`] the backend hits (timeout, unavailable, bad request).
    fn narrate(&self, job: &NarrationJob) -> std::result::Result<String, LlmError>;
}

impl<F> Narrator for F
where
    F: Fn(&NarrationJob) -> std::result::Result<String, LlmError>,
{
    fn narrate(&self, job: &NarrationJob) -> std::result::Result<String, LlmError> {
        self(job)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// What the parser extracted from the transcript.
    pub facts: EngineFacts,
    /// The job handed to the narrator.
    pub job: NarrationJob,
    /// The normalized narrator payload.
    pub payload: NarrationPayload,
    /// Narration text shown to the player.
    pub narration: String,
    /// Status figures after this turn.
    pub status: StatusLine,
    /// The narrator failed and the fallback payload was used.
    pub used_fallback: bool,
}

/// A running game: scene memory plus the loaded prompt spec and response
/// schema.
pub struct NarrationSession {
    store: Mutex<SceneMemoryStore>,
    spec: PromptSpec,
    schema: Value,
    trigger: String,
}

impl std::fmt::Debug for NarrationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationSession")
            .field("trigger", &self.trigger)
            .field("spec_version", &self.spec.spec_version)
            .finish_non_exhaustive()
    }
}

impl NarrationSession {
    /// Assemble a session from already-loaded parts.
    #[must_use]
    pub fn new(store: SceneMemoryStore, spec: PromptSpec, schema: Value) -> Self {
        Self {
            store: Mutex::new(store),
            spec,
            schema,
            trigger: DEFAULT_TRIGGER.to_string(),
        }
    }

    /// Override the trigger label recorded in job metadata.
    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    /// Build a session from configuration.
    ///
    /// Opens the scene database when persistence is enabled and loads the
    /// prompt spec and response schema, falling back to the built-ins when
    /// no path is configured.
    ///
    /// # Errors
    /// Any database, I/O, parse or spec validation failure. These are
    /// startup errors and should abort the host.
    pub fn from_config(config: &IfMemConfig) -> Result<Self> {
        let player_name = config.general.player_name.clone();
        let memory = config.memory.clone();

        let store = if config.persistence.enabled {
            let repository =
                SqliteSceneRepository::open(&config.persistence.db_path, &config.persistence)?;
            SceneMemoryStore::with_repository(player_name, memory, Box::new(repository))
        } else {
            SceneMemoryStore::new(player_name, memory)
        };

        let spec = match &config.narration.prompt_spec_path {
            Some(path) => PromptSpec::from_file(path)?,
            None => PromptSpec::builtin()?,
        };
        let schema = match &config.narration.response_schema_path {
            Some(path) => load_schema(path)?,
            None => builtin_response_schema()?,
        };

        info!(
            persistence = config.persistence.enabled,
            custom_spec = config.narration.prompt_spec_path.is_some(),
            custom_schema = config.narration.response_schema_path.is_some(),
            "Narration session ready"
        );
        Ok(Self::new(store, spec, schema).with_trigger(config.narration.trigger.clone()))
    }

    /// Resolve one player command.
    ///
    /// Parses `transcript`, folds it into memory (the previous room is the
    /// last resolved one), renders the narration job, asks `narrator`,
    /// normalizes the reply and stores the narration in the current scene.
    /// Fallback narrations and narrations of rejected commands are not
    /// stored.
    ///
    /// # Errors
    /// Only rendering failures, i.e. a prompt spec whose object template
    /// names a field the context does not have. Narrator failures degrade
    /// to the fallback payload.
    pub fn play_turn(
        &self,
        command: &str,
        transcript: &str,
        narrator: &dyn Narrator,
    ) -> Result<TurnOutcome> {
        let mut store = self.store.lock();

        let facts = parse_engine_facts(transcript);
        let previous_room = store.current_room().map(str::to_string);
        store.ingest(&facts, Some(command), previous_room.as_deref(), Some(transcript));

        let view = store.context_snapshot().with_turn_hints(turn_hints(command, transcript, &facts));
        let status = StatusLine::from(&view);
        let context = view.to_json()?;
        let job = build_narration_job(&context, &self.spec, &self.trigger)?;

        let (payload, used_fallback) = self.resolve_payload(&job, narrator)?;
        let narration = payload.narration.trim().to_string();
        // Fallback text and rejected commands say nothing about the room.
        if used_fallback || facts.is_exception {
            debug!(fallback = used_fallback, exception = facts.is_exception, "Narration not stored");
        } else if store.append_narration(None, &narration) {
            debug!(chars = narration.len(), "Narration stored");
        }

        info!(
            turn = store.turn_count(),
            room = status.room.as_deref().unwrap_or("-"),
            exception = facts.is_exception,
            fallback = used_fallback,
            "Turn resolved"
        );
        Ok(TurnOutcome {
            facts,
            job,
            payload,
            narration,
            status,
            used_fallback,
        })
    }

    fn resolve_payload(
        &self,
        job: &NarrationJob,
        narrator: &dyn Narrator,
    ) -> Result<(NarrationPayload, bool)> {
        let reply = match narrator.narrate(job) {
            Ok(reply) => parse_reply(&reply),
            Err(e) => {
                warn!(error = %e, "Narrator failed, using fallback payload");
                None
            }
        };

        if let Some(reply) = reply {
            let normalized = normalize(Some(&reply), &self.schema);
            match NarrationPayload::from_normalized(&normalized) {
                Ok(payload) if !payload.narration.trim().is_empty() => return Ok((payload, false)),
                Ok(_) => warn!("Narrator reply had no narration, using fallback payload"),
                Err(e) => warn!(error = %e, "Narrator reply unreadable, using fallback payload"),
            }
        }

        let fallback = serde_json::to_value(NarrationPayload::fallback()).map_err(LlmError::from)?;
        let normalized = normalize(Some(&fallback), &self.schema);
        Ok((NarrationPayload::from_normalized(&normalized)?, true))
    }

    /// Current context snapshot, without turn hints.
    #[must_use]
    pub fn snapshot(&self) -> ContextView {
        self.store.lock().context_snapshot()
    }

    /// Current status figures.
    #[must_use]
    pub fn status(&self) -> StatusLine {
        StatusLine::from(&self.snapshot())
    }

    /// Read the store under the session lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&SceneMemoryStore) -> R) -> R {
        f(&self.store.lock())
    }

    /// Start a new game, forgetting all scenes including persisted ones.
    pub fn reset(&self) {
        self.store.lock().reset();
    }
}

fn turn_hints(command: &str, transcript: &str, facts: &EngineFacts) -> TurnHints {
    let command = command.trim();
    TurnHints {
        command: (!command.is_empty()).then(|| command.to_string()),
        engine_excerpt: if facts.is_exception {
            None
        } else {
            body_after_header(transcript)
        },
        is_exception: facts.is_exception,
        exception_message: facts.exception_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_skip_excerpt_for_exceptions() {
        let facts = parse_engine_facts("I don't know the word \"fly\".");
        let hints = turn_hints(" fly ", "I don't know the word \"fly\".", &facts);
        assert_eq!(hints.command.as_deref(), Some("fly"));
        assert!(hints.is_exception);
        assert!(hints.engine_excerpt.is_none());
        assert!(hints.exception_message.is_some());
    }

    #[test]
    fn hints_carry_body_text() {
        let transcript = "Attic   Score: 0   Moves: 3\n\nA dusty attic.";
        let facts = parse_engine_facts(transcript);
        let hints = turn_hints("", transcript, &facts);
        assert!(hints.command.is_none());
        assert_eq!(hints.engine_excerpt.as_deref(), Some("A dusty attic."));
        assert!(!hints.is_exception);
    }
}
