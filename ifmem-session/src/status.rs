//! Status line for an external display (room, score, moves).

use std::fmt;

use ifmem_core::ContextView;
use serde::{Deserialize, Serialize};

/// What a status bar shows after each turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    /// Current room, if any has resolved.
    pub room: Option<String>,
    /// Last reported score.
    pub score: Option<u32>,
    /// Last reported move count.
    pub moves: Option<u32>,
}

impl From<&ContextView> for StatusLine {
    fn from(view: &ContextView) -> Self {
        Self {
            room: view.current_room.clone(),
            score: view.player_state.score,
            moves: view.player_state.moves,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.room.as_deref().unwrap_or("-"))?;
        if let Some(score) = self.score {
            write!(f, "  Score: {score}")?;
        }
        if let Some(moves) = self.moves {
            write!(f, "  Moves: {moves}")?;
        }
        Ok(())
    }
}
