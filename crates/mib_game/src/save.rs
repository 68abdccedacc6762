//! Save-game persistence.
//!
//! A save is a JSON object with two keys:
//!
//! ```json
//! { "player_data": { "health": 3, "max_health": 3, "coins": 4, "messages": [] },
//!   "level_number": 2 }
//! ```
//!
//! `level_number` is the index of the last completed entry in the level list;
//! resuming continues at `level_number + 1`. Older saves stored it as a string,
//! so numeric strings are accepted on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{GameError, GameResult};
use crate::stats::PlayerStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveGame {
    pub player_data: PlayerStats,
    pub level_number: usize,
}

impl SaveGame {
    pub fn from_value(value: &Value) -> GameResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| GameError::SaveData("save data must be a JSON object".to_string()))?;
        let player_value = object
            .get("player_data")
            .ok_or_else(|| GameError::SaveData("missing key 'player_data'".to_string()))?;
        let player_data = PlayerStats::from_value(player_value)
            .map_err(|e| GameError::SaveData(format!("player_data: {e}")))?;
        player_data
            .check_playable()
            .map_err(|e| GameError::SaveData(format!("player_data: {e}")))?;
        let level_value = object
            .get("level_number")
            .ok_or_else(|| GameError::SaveData("missing key 'level_number'".to_string()))?;
        let level_number = parse_level_number(level_value)?;
        Ok(Self {
            player_data,
            level_number,
        })
    }

    /// Level index a resumed game continues from.
    pub fn resume_index(&self) -> usize {
        self.level_number + 1
    }
}

fn parse_level_number(value: &Value) -> GameResult<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        GameError::SaveData(format!(
            "level_number must be a non-negative integer, got {value}"
        ))
    })
}

pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the raw save blob. A missing file is `Ok(None)`; an unreadable file
    /// or invalid JSON is an error.
    pub fn load_raw(&self) -> GameResult<Option<Value>> {
        if !self.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| GameError::SaveIo {
            path: self.path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&raw).map_err(|source| GameError::SaveParse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(value))
    }

    pub fn write(&self, save: &SaveGame) -> GameResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| GameError::SaveIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(save)
            .map_err(|e| GameError::SaveData(e.to_string()))?;
        fs::write(&self.path, json).map_err(|source| GameError::SaveIo {
            path: self.path.clone(),
            source,
        })?;
        log::info!(
            "Saved game to {} (last completed level {})",
            self.path.display(),
            save.level_number
        );
        Ok(())
    }
}
