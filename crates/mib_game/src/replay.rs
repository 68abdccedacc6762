use mib_core::input::{InputState, Key};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::level::Level;
use crate::transition::Transition;

/// Scripted keyboard input: each frame lists the keys held during that step.
/// Presses and releases are derived from the change between frames.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub keys: Vec<ReplayKey>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplayKey {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Space,
    Enter,
}

impl ReplayKey {
    fn key(self) -> Key {
        match self {
            ReplayKey::Left => Key::Left,
            ReplayKey::Right => Key::Right,
            ReplayKey::Up => Key::Up,
            ReplayKey::Down => Key::Down,
            ReplayKey::Escape => Key::Escape,
            ReplayKey::Space => Key::Space,
            ReplayKey::Enter => Key::Enter,
        }
    }
}

impl ReplaySequence {
    pub fn expanded_frames(&self) -> Vec<Vec<Key>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let keys: Vec<Key> = frame.keys.iter().map(|k| k.key()).collect();
            for _ in 0..frame.repeat.max(1) {
                out.push(keys.clone());
            }
        }
        out
    }

    /// Drive `level` through every frame, returning the transitions it emitted.
    pub fn run(&self, level: &mut Level) -> Vec<Transition> {
        let mut input = InputState::new();
        let mut held: Vec<Key> = Vec::new();
        let mut transitions = Vec::new();
        for keys in self.expanded_frames() {
            for key in held.iter().filter(|k| !keys.contains(k)) {
                input.key_up(*key);
            }
            for key in &keys {
                input.key_down(*key);
            }
            held = keys;
            transitions.extend(level.step(&input, self.fixed_dt));
            input.end_frame();
        }
        transitions
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioPlayer;
    use crate::level_file::parse_level_file;
    use crate::stats::PlayerStats;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "mib_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn replay_from(name_hint: &str, body: &str) -> ReplaySequence {
        let path = temp_file_path(name_hint);
        fs::write(&path, body).expect("write replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        let _ = fs::remove_file(path);
        replay
    }

    /// A flat beach with one coin and the goal at the far end.
    fn flat_level() -> Level {
        let file = parse_level_file(
            r#"{
              "version": "0.1",
              "level_id": "1",
              "name": "Flat Beach",
              "collision": {
                "cell_size": 32,
                "width": 16,
                "height": 6,
                "rects": [ { "x": 0, "y": 0, "w": 16, "h": 1 } ]
              },
              "spawn": { "x": 1, "y": 1 },
              "goal": { "x": 14, "y": 1 },
              "pickups": [ { "id": "c1", "kind": "coin", "x": 5, "y": 1 } ]
            }"#,
        )
        .expect("flat level parses");
        Level::new(&file, Rc::new(AudioPlayer::disabled()), PlayerStats::initial())
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let replay = replay_from(
            "parse",
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "keys": ["right"], "repeat": 3 },
                { "keys": ["right", "space"] }
              ]
            }"#,
        );
        let frames = replay.expanded_frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3], vec![Key::Right, Key::Space]);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn walking_right_collects_coin_and_reaches_goal() {
        let replay = replay_from(
            "walk",
            r#"{ "frames": [ { "keys": ["right"], "repeat": 240 } ] }"#,
        );
        let mut level = flat_level();
        let transitions = replay.run(&mut level);
        assert_eq!(transitions.len(), 1);
        match &transitions[0] {
            Transition::Advance {
                updated_player_data: Some(stats),
            } => assert_eq!(stats.coins, 1),
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[test]
    fn pause_menu_restart_via_replay() {
        let replay = replay_from(
            "pause",
            r#"{
              "frames": [
                { "keys": [], "repeat": 10 },
                { "keys": ["escape"] },
                { "keys": [] },
                { "keys": ["down"] },
                { "keys": [] },
                { "keys": ["enter"] }
              ]
            }"#,
        );
        let mut level = flat_level();
        assert_eq!(replay.run(&mut level), vec![Transition::Restart]);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay = replay_from(
            "deterministic",
            r#"{
              "frames": [
                { "keys": ["right"], "repeat": 30 },
                { "keys": ["right", "space"], "repeat": 20 },
                { "keys": ["left"], "repeat": 25 }
              ]
            }"#,
        );
        let mut run_a = flat_level();
        let mut run_b = flat_level();
        replay.run(&mut run_a);
        replay.run(&mut run_b);

        let (a, b) = (run_a.player_aabb(), run_b.player_aabb());
        assert!((a.center_x - b.center_x).abs() < 0.0001);
        assert!((a.center_y - b.center_y).abs() < 0.0001);
        assert_eq!(run_a.stats(), run_b.stats());
    }
}
