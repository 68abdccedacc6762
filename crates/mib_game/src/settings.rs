//! Compile-time game settings. Launch flags override the paths and toggles.

use std::path::{Path, PathBuf};

use crate::audio::SoundEffect;

pub const TITLE: &str = "Message in a Bottle";
pub const WIDTH: u32 = 1280;
pub const HEIGHT: u32 = 720;
pub const FPS: u32 = 60;

/// Ordered state list. Index 0 is always the title screen and index 1 the
/// intro; every later entry names a playable level file.
pub const LEVELS: [&str; 5] = ["Title", "Intro", "1", "2", "3"];
pub const TITLE_INDEX: usize = 0;
pub const INTRO_INDEX: usize = 1;

pub const DEFAULT_ASSET_DIR: &str = "assets";
pub const DEFAULT_SAVE_PATH: &str = "saves/savegame.json";

/// Looping background tracks, addressed by `AudioPlayer::play_song(index)`.
pub const MUSIC_TRACKS: &[&str] = &["audio/music/shoreline.wav", "audio/music/tides.wav"];

pub const SOUND_EFFECTS: &[(SoundEffect, &str)] = &[
    (SoundEffect::Jump, "audio/sfx/jump.wav"),
    (SoundEffect::Coin, "audio/sfx/coin.wav"),
    (SoundEffect::Heart, "audio/sfx/heart.wav"),
    (SoundEffect::Bottle, "audio/sfx/bottle.wav"),
    (SoundEffect::Hurt, "audio/sfx/hurt.wav"),
    (SoundEffect::Stomp, "audio/sfx/stomp.wav"),
    (SoundEffect::Goal, "audio/sfx/goal.wav"),
    (SoundEffect::MenuMove, "audio/sfx/menu_move.wav"),
    (SoundEffect::MenuSelect, "audio/sfx/menu_select.wav"),
];

pub const MUSIC_VOLUME: f32 = 0.6;
pub const SOUND_FX_VOLUME: f32 = 0.8;

pub fn level_file_path(asset_dir: &Path, level_id: &str) -> PathBuf {
    asset_dir.join("levels").join(format!("level_{level_id}.json"))
}

pub fn playable_level_ids() -> impl Iterator<Item = &'static str> {
    LEVELS.iter().skip(INTRO_INDEX + 1).copied()
}
