use std::path::PathBuf;

use crate::audio::AudioError;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("level {index} is outside the level list (0..{len})")]
    LevelOutOfRange { index: usize, len: usize },

    #[error("no level file loaded for level '{0}'")]
    UnknownLevel(String),

    #[error("{0}")]
    LevelFile(String),

    #[error("failed to access save file {path}: {source}")]
    SaveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("save file {path} is not valid JSON: {source}")]
    SaveParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed save data: {0}")]
    SaveData(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

pub type GameResult<T> = Result<T, GameError>;
