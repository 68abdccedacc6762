use serde_json::Value;

use crate::stats::PlayerStats;

/// A request from the active state, returned from its `step` and applied by
/// `Game` before the next step runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Move to the next entry of the level list. `None` keeps the current
    /// player stats.
    Advance {
        updated_player_data: Option<PlayerStats>,
    },
    Restart,
    /// Continue from a raw save blob.
    Resume(Value),
    ReturnToTitle,
    SaveAndReturnToTitle,
}

impl Transition {
    pub fn advance() -> Self {
        Self::Advance {
            updated_player_data: None,
        }
    }

    pub fn advance_with(stats: PlayerStats) -> Self {
        Self::Advance {
            updated_player_data: Some(stats),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Restart => "restart",
            Self::Resume(_) => "resume",
            Self::ReturnToTitle => "return to title",
            Self::SaveAndReturnToTitle => "save and return to title",
        }
    }
}

/// Whether the frame loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}
