use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::collision::{
    cell_in_bounds, validate_collision_layer, CollisionGrid, CollisionLayer, GridCell,
};
use crate::error::{GameError, GameResult};
use crate::settings::{level_file_path, playable_level_ids};

const SUPPORTED_VERSION: &str = "0.1";

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    pub name: String,
    pub collision: CollisionLayer,
    pub spawn: GridCell,
    pub goal: GridCell,
    #[serde(default)]
    pub hazards: Vec<GridCell>,
    #[serde(default)]
    pub pickups: Vec<PickupSpec>,
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PickupKind {
    Coin,
    Heart,
    Bottle,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PickupSpec {
    pub id: String,
    pub kind: PickupKind,
    pub x: i32,
    pub y: i32,
}

impl PickupSpec {
    pub fn cell(&self) -> GridCell {
        GridCell { x: self.x, y: self.y }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnemySpec {
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// Patrol range in cells, inclusive.
    pub patrol_min: i32,
    pub patrol_max: i32,
    #[serde(default = "default_enemy_speed")]
    pub speed: f32,
}

pub fn parse_level_file(raw: &str) -> Result<LevelFile, String> {
    let level: LevelFile =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse level JSON: {e}"))?;
    validate_level(&level)?;
    Ok(level)
}

pub fn load_level_from_path(level_path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(level_path)
        .map_err(|e| format!("Failed to read level file {}: {e}", level_path.display()))?;
    parse_level_file(&raw).map_err(|e| format!("{} ({})", e, level_path.display()))
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    if level.version != SUPPORTED_VERSION {
        return Err(format!(
            "Level validation failed: unsupported version '{}' (expected '{SUPPORTED_VERSION}')",
            level.version
        ));
    }
    if level.level_id.trim().is_empty() {
        return Err("Level validation failed: level_id is empty".to_string());
    }
    validate_collision_layer(&level.collision)?;

    let layer = &level.collision;
    for (label, cell) in [("spawn", level.spawn), ("goal", level.goal)] {
        if !cell_in_bounds(layer, cell) {
            return Err(format!(
                "Level validation failed: {label} cell out of bounds ({}, {})",
                cell.x, cell.y
            ));
        }
    }
    for cell in &level.hazards {
        if !cell_in_bounds(layer, *cell) {
            return Err(format!(
                "Level validation failed: hazard cell out of bounds ({}, {})",
                cell.x, cell.y
            ));
        }
    }

    let mut ids = HashSet::new();
    for pickup in &level.pickups {
        if !ids.insert(pickup.id.as_str()) {
            return Err(format!(
                "Level validation failed: duplicate object id '{}'",
                pickup.id
            ));
        }
        if !cell_in_bounds(layer, pickup.cell()) {
            return Err(format!(
                "Level validation failed: pickup '{}' out of bounds",
                pickup.id
            ));
        }
    }
    for enemy in &level.enemies {
        if !ids.insert(enemy.id.as_str()) {
            return Err(format!(
                "Level validation failed: duplicate object id '{}'",
                enemy.id
            ));
        }
        if enemy.patrol_min > enemy.patrol_max {
            return Err(format!(
                "Level validation failed: enemy '{}' has patrol_min > patrol_max",
                enemy.id
            ));
        }
        let start = GridCell { x: enemy.x, y: enemy.y };
        let lo = GridCell { x: enemy.patrol_min, y: enemy.y };
        let hi = GridCell { x: enemy.patrol_max, y: enemy.y };
        if !cell_in_bounds(layer, start) || !cell_in_bounds(layer, lo) || !cell_in_bounds(layer, hi) {
            return Err(format!(
                "Level validation failed: enemy '{}' patrols out of bounds",
                enemy.id
            ));
        }
        if enemy.speed <= 0.0 {
            return Err(format!(
                "Level validation failed: enemy '{}' speed must be > 0",
                enemy.id
            ));
        }
    }

    if level.pickups.is_empty() {
        log::warn!(
            "Level '{}' has no pickups. This is allowed but often accidental.",
            level.level_id
        );
    }
    Ok(())
}

/// Every playable level file, keyed by level id.
#[derive(Debug, Clone, Default)]
pub struct LevelCatalog {
    levels: HashMap<String, LevelFile>,
}

impl LevelCatalog {
    /// Load `levels/level_<id>.json` for each playable id under `asset_dir`.
    pub fn load_dir(asset_dir: &Path) -> GameResult<Self> {
        let mut levels = HashMap::new();
        for id in playable_level_ids() {
            let path = level_file_path(asset_dir, id);
            let level = load_level_from_path(&path).map_err(GameError::LevelFile)?;
            if level.level_id != id {
                return Err(GameError::LevelFile(format!(
                    "{} declares level_id '{}', expected '{id}'",
                    path.display(),
                    level.level_id
                )));
            }
            log::info!(
                "Loaded level '{}' ({}) with {} solid cells, {} pickups, {} enemies",
                id,
                level.name,
                CollisionGrid::from_layer(&level.collision).solid_count(),
                level.pickups.len(),
                level.enemies.len()
            );
            levels.insert(id.to_string(), level);
        }
        Ok(Self { levels })
    }

    pub fn from_files(files: impl IntoIterator<Item = LevelFile>) -> Self {
        Self {
            levels: files
                .into_iter()
                .map(|level| (level.level_id.clone(), level))
                .collect(),
        }
    }

    pub fn get(&self, level_id: &str) -> GameResult<&LevelFile> {
        self.levels
            .get(level_id)
            .ok_or_else(|| GameError::UnknownLevel(level_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

const fn default_enemy_speed() -> f32 {
    60.0
}

#[cfg(test)]
pub(crate) fn sample_level(level_id: &str) -> LevelFile {
    let raw = format!(
        r#"{{
          "version": "0.1",
          "level_id": "{level_id}",
          "name": "Test Cove {level_id}",
          "collision": {{
            "cell_size": 32,
            "origin": {{ "x": 0, "y": 0 }},
            "width": 24,
            "height": 10,
            "rects": [ {{ "x": 0, "y": 0, "w": 24, "h": 1 }} ]
          }},
          "spawn": {{ "x": 1, "y": 1 }},
          "goal": {{ "x": 22, "y": 1 }},
          "hazards": [ {{ "x": 12, "y": 1 }} ],
          "pickups": [
            {{ "id": "c1", "kind": "coin", "x": 3, "y": 1 }},
            {{ "id": "b1", "kind": "bottle", "x": 5, "y": 1 }}
          ],
          "enemies": [
            {{ "id": "crab", "x": 17, "y": 1, "patrol_min": 16, "patrol_max": 19, "speed": 40.0 }}
          ]
        }}"#
    );
    parse_level_file(&raw).expect("sample level must be valid")
}
