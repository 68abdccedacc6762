//! A playable stage.
//!
//! The level owns its own copy of the player stats. Pickups and damage mutate
//! that copy; it only reaches `Game` through `Transition::Advance` when the
//! goal is touched, so dying or quitting mid-level never leaks partial progress.

use std::rc::Rc;

use mib_core::draw::{with_alpha, DrawList, Rgba};
use mib_core::input::{InputState, Key};

use crate::audio::{AudioPlayer, SoundEffect};
use crate::collision::{Aabb, CollisionGrid, GridCell};
use crate::controller::{CharacterController, ControllerInput};
use crate::level_file::{LevelFile, PickupKind};
use crate::settings::{HEIGHT, WIDTH};
use crate::stats::PlayerStats;
use crate::transition::Transition;

const PLAYER_HALF_W: f32 = 10.0;
const PLAYER_HALF_H: f32 = 14.0;
const ENEMY_HALF: f32 = 12.0;
const PICKUP_HALF: f32 = 8.0;
const INVULNERABLE_SECONDS: f32 = 1.0;
const DEATH_DELAY_SECONDS: f32 = 1.2;
/// A stomp only counts when the player's feet are within this distance of the
/// enemy's top.
const STOMP_TOLERANCE: f32 = 8.0;

const LEFT_KEYS: &[Key] = &[Key::Left, Key::A];
const RIGHT_KEYS: &[Key] = &[Key::Right, Key::D];
const JUMP_KEYS: &[Key] = &[Key::Space, Key::W, Key::Up];
const MENU_UP: &[Key] = &[Key::Up, Key::W];
const MENU_DOWN: &[Key] = &[Key::Down, Key::S];
const MENU_SELECT: &[Key] = &[Key::Enter, Key::Space];

const SKY: Rgba = [0.05, 0.09, 0.18, 1.0];
const SAND: Rgba = [0.76, 0.65, 0.42, 1.0];
const SPIKES: Rgba = [0.85, 0.2, 0.2, 1.0];
const GOAL: Rgba = [0.35, 0.9, 0.5, 1.0];
const COIN: Rgba = [1.0, 0.85, 0.2, 1.0];
const HEART: Rgba = [1.0, 0.4, 0.6, 1.0];
const BOTTLE: Rgba = [0.55, 0.85, 1.0, 1.0];
const CRAB: Rgba = [0.95, 0.45, 0.15, 1.0];
const PLAYER: Rgba = [0.95, 0.95, 0.9, 1.0];
const EYE: Rgba = [0.1, 0.1, 0.15, 1.0];
const TEXT: Rgba = [1.0, 1.0, 1.0, 1.0];
const TEXT_DIM: Rgba = [0.6, 0.6, 0.65, 1.0];
const HIGHLIGHT: Rgba = [1.0, 0.85, 0.3, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseEntry {
    Resume,
    RestartLevel,
    SaveAndQuit,
    QuitToTitle,
}

impl PauseEntry {
    const ALL: [PauseEntry; 4] = [
        PauseEntry::Resume,
        PauseEntry::RestartLevel,
        PauseEntry::SaveAndQuit,
        PauseEntry::QuitToTitle,
    ];

    fn label(self) -> &'static str {
        match self {
            PauseEntry::Resume => "Resume",
            PauseEntry::RestartLevel => "Restart Level",
            PauseEntry::SaveAndQuit => "Save & Quit",
            PauseEntry::QuitToTitle => "Quit to Title",
        }
    }
}

#[derive(Debug, Clone)]
struct Pickup {
    id: String,
    kind: PickupKind,
    aabb: Aabb,
    collected: bool,
}

#[derive(Debug, Clone)]
struct Enemy {
    id: String,
    aabb: Aabb,
    min_x: f32,
    max_x: f32,
    speed: f32,
    direction: f32,
    alive: bool,
}

impl Enemy {
    fn patrol(&mut self, dt: f32) {
        self.aabb.center_x += self.direction * self.speed * dt;
        if self.aabb.center_x >= self.max_x {
            self.aabb.center_x = self.max_x;
            self.direction = -1.0;
        } else if self.aabb.center_x <= self.min_x {
            self.aabb.center_x = self.min_x;
            self.direction = 1.0;
        }
    }
}

pub struct Level {
    level_id: String,
    name: String,
    grid: CollisionGrid,
    audio: Rc<AudioPlayer>,
    stats: PlayerStats,
    player: CharacterController,
    goal: Aabb,
    hazards: Vec<Aabb>,
    pickups: Vec<Pickup>,
    enemies: Vec<Enemy>,
    invulnerable: f32,
    death_timer: Option<f32>,
    pause_cursor: Option<usize>,
    finished: bool,
}

impl Level {
    pub fn new(file: &LevelFile, audio: Rc<AudioPlayer>, player_data: PlayerStats) -> Self {
        let grid = CollisionGrid::from_layer(&file.collision);
        let spawn = grid.cell_aabb(file.spawn);
        let player = CharacterController::new(Aabb {
            center_x: spawn.center_x,
            center_y: spawn.bottom() + PLAYER_HALF_H + 0.5,
            half_w: PLAYER_HALF_W,
            half_h: PLAYER_HALF_H,
        });

        let hazards = file.hazards.iter().map(|cell| hazard_box(&grid, *cell)).collect();
        let pickups = file
            .pickups
            .iter()
            .map(|spec| {
                let cell = grid.cell_aabb(spec.cell());
                Pickup {
                    id: spec.id.clone(),
                    kind: spec.kind,
                    aabb: Aabb {
                        half_w: PICKUP_HALF,
                        half_h: PICKUP_HALF,
                        ..cell
                    },
                    collected: false,
                }
            })
            .collect();
        let enemies = file
            .enemies
            .iter()
            .map(|spec| {
                let start = grid.cell_aabb(GridCell { x: spec.x, y: spec.y });
                let lo = grid.cell_aabb(GridCell { x: spec.patrol_min, y: spec.y });
                let hi = grid.cell_aabb(GridCell { x: spec.patrol_max, y: spec.y });
                Enemy {
                    id: spec.id.clone(),
                    aabb: Aabb {
                        center_x: start.center_x,
                        center_y: start.bottom() + ENEMY_HALF,
                        half_w: ENEMY_HALF,
                        half_h: ENEMY_HALF,
                    },
                    min_x: lo.center_x,
                    max_x: hi.center_x,
                    speed: spec.speed,
                    direction: 1.0,
                    alive: true,
                }
            })
            .collect();

        log::info!(
            "Entering level '{}' ({}) with {}",
            file.level_id,
            file.name,
            player_data.summary()
        );
        Self {
            level_id: file.level_id.clone(),
            name: file.name.clone(),
            goal: grid.cell_aabb(file.goal),
            grid,
            audio,
            stats: player_data,
            player,
            hazards,
            pickups,
            enemies,
            invulnerable: 0.0,
            death_timer: None,
            pause_cursor: None,
            finished: false,
        }
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn is_paused(&self) -> bool {
        self.pause_cursor.is_some()
    }

    #[cfg(test)]
    pub fn player_aabb(&self) -> Aabb {
        self.player.aabb
    }

    pub fn step(&mut self, input: &InputState, dt: f32) -> Option<Transition> {
        if self.finished {
            return None;
        }
        if self.pause_cursor.is_some() {
            return self.step_pause_menu(input);
        }
        if let Some(timer) = self.death_timer.as_mut() {
            *timer -= dt;
            if *timer <= 0.0 {
                self.finished = true;
                log::info!("Restarting level '{}' after death", self.level_id);
                return Some(Transition::Restart);
            }
            return None;
        }
        if input.is_just_pressed(Key::Escape) {
            self.pause_cursor = Some(0);
            log::debug!("Paused level '{}'", self.level_id);
            return None;
        }

        self.invulnerable = (self.invulnerable - dt).max(0.0);
        let controller_input = ControllerInput {
            move_x: input.axis(LEFT_KEYS, RIGHT_KEYS),
            jump_pressed: input.any_just_pressed(JUMP_KEYS),
            jump_held: input.any_held(JUMP_KEYS),
        };
        let events = self.player.step(controller_input, dt, &self.grid);
        if events.jumped {
            self.audio.play_effect(SoundEffect::Jump);
        }

        for enemy in self.enemies.iter_mut().filter(|e| e.alive) {
            enemy.patrol(dt);
        }
        self.collect_pickups();
        self.resolve_enemy_contacts();
        self.resolve_hazards();

        if self.player.aabb.top() < self.grid.floor_world() {
            log::debug!("Player fell out of level '{}'", self.level_id);
            self.stats.health = 0;
        }
        if self.stats.is_dead() {
            self.die();
            return None;
        }

        if self.player.aabb.overlaps(&self.goal) {
            self.finished = true;
            self.audio.play_effect(SoundEffect::Goal);
            log::info!(
                "Level '{}' complete with {}",
                self.level_id,
                self.stats.summary()
            );
            return Some(Transition::advance_with(self.stats.clone()));
        }
        None
    }

    fn step_pause_menu(&mut self, input: &InputState) -> Option<Transition> {
        let cursor = self.pause_cursor.unwrap_or(0);
        let count = PauseEntry::ALL.len();
        if input.is_just_pressed(Key::Escape) {
            self.pause_cursor = None;
            return None;
        }
        if input.any_just_pressed(MENU_UP) {
            self.pause_cursor = Some((cursor + count - 1) % count);
            self.audio.play_effect(SoundEffect::MenuMove);
            return None;
        }
        if input.any_just_pressed(MENU_DOWN) {
            self.pause_cursor = Some((cursor + 1) % count);
            self.audio.play_effect(SoundEffect::MenuMove);
            return None;
        }
        if !input.any_just_pressed(MENU_SELECT) {
            return None;
        }

        self.audio.play_effect(SoundEffect::MenuSelect);
        let transition = match PauseEntry::ALL[cursor] {
            PauseEntry::Resume => {
                self.pause_cursor = None;
                return None;
            }
            PauseEntry::RestartLevel => Transition::Restart,
            PauseEntry::SaveAndQuit => Transition::SaveAndReturnToTitle,
            PauseEntry::QuitToTitle => Transition::ReturnToTitle,
        };
        self.finished = true;
        Some(transition)
    }

    fn collect_pickups(&mut self) {
        let player = self.player.aabb;
        for pickup in self
            .pickups
            .iter_mut()
            .filter(|p| !p.collected && p.aabb.overlaps(&player))
        {
            pickup.collected = true;
            let effect = match pickup.kind {
                PickupKind::Coin => {
                    self.stats.add_coin();
                    SoundEffect::Coin
                }
                PickupKind::Heart => {
                    self.stats.heal(1);
                    SoundEffect::Heart
                }
                PickupKind::Bottle => {
                    self.stats.collect_message(&pickup.id);
                    SoundEffect::Bottle
                }
            };
            self.audio.play_effect(effect);
            log::debug!("Picked up {:?} '{}'", pickup.kind, pickup.id);
        }
    }

    fn resolve_enemy_contacts(&mut self) {
        let mut hurt_from = None;
        for enemy in self.enemies.iter_mut().filter(|e| e.alive) {
            if !enemy.aabb.overlaps(&self.player.aabb) {
                continue;
            }
            let feet = self.player.aabb.bottom();
            if self.player.is_falling() && feet >= enemy.aabb.top() - STOMP_TOLERANCE {
                enemy.alive = false;
                self.player.bounce();
                self.audio.play_effect(SoundEffect::Stomp);
                log::debug!("Stomped enemy '{}'", enemy.id);
            } else {
                hurt_from = Some(enemy.aabb.center_x);
            }
        }
        if let Some(from_x) = hurt_from {
            self.hurt(from_x);
        }
    }

    fn resolve_hazards(&mut self) {
        let player = self.player.aabb;
        if let Some(from_x) = self
            .hazards
            .iter()
            .find(|h| h.overlaps(&player))
            .map(|h| h.center_x)
        {
            self.hurt(from_x);
        }
    }

    fn hurt(&mut self, from_x: f32) {
        if self.invulnerable > 0.0 {
            return;
        }
        self.stats.damage(1);
        self.invulnerable = INVULNERABLE_SECONDS;
        self.player.knockback(from_x);
        self.audio.play_effect(SoundEffect::Hurt);
        log::debug!("Player hurt, health now {}", self.stats.health);
    }

    fn die(&mut self) {
        self.death_timer = Some(DEATH_DELAY_SECONDS);
        self.audio.play_effect(SoundEffect::Hurt);
        log::info!("Player died in level '{}'", self.level_id);
    }

    pub fn draw(&self, list: &mut DrawList) {
        list.camera.center_x = follow_axis(
            self.player.aabb.center_x,
            self.grid.horizontal_bounds(),
            WIDTH as f32 * 0.5,
        );
        list.camera.center_y = follow_axis(
            self.player.aabb.center_y,
            self.grid.vertical_bounds(),
            HEIGHT as f32 * 0.5,
        );

        let (min_x, max_x) = self.grid.horizontal_bounds();
        let (min_y, max_y) = self.grid.vertical_bounds();
        list.quad(
            (min_x + max_x) * 0.5,
            (min_y + max_y) * 0.5,
            max_x - min_x,
            max_y - min_y,
            SKY,
        );

        let cell = self.grid.cell_size as f32;
        for solid in self.grid.solids_iter() {
            let b = self.grid.cell_aabb(*solid);
            list.quad(b.center_x, b.center_y, cell, cell, SAND);
        }
        for hazard in &self.hazards {
            push_aabb(list, hazard, SPIKES);
        }
        push_aabb(list, &self.goal, GOAL);
        for pickup in self.pickups.iter().filter(|p| !p.collected) {
            let color = match pickup.kind {
                PickupKind::Coin => COIN,
                PickupKind::Heart => HEART,
                PickupKind::Bottle => BOTTLE,
            };
            push_aabb(list, &pickup.aabb, color);
        }
        for enemy in self.enemies.iter().filter(|e| e.alive) {
            push_aabb(list, &enemy.aabb, CRAB);
        }

        let blink_hidden = self.invulnerable > 0.0 && ((self.invulnerable * 10.0) as i32) % 2 == 1;
        if !blink_hidden {
            let fade = self
                .death_timer
                .map(|t| t / DEATH_DELAY_SECONDS)
                .unwrap_or(1.0);
            let player = self.player.aabb;
            push_aabb(list, &player, with_alpha(PLAYER, fade));
            // Eye on the side the player faces.
            list.quad(
                player.center_x + self.player.facing * player.half_w * 0.5,
                player.center_y + player.half_h * 0.4,
                4.0,
                4.0,
                with_alpha(EYE, fade),
            );
        }

        list.text_left(self.name.clone(), [0.02, 0.03], 24.0, TEXT);
        list.text_left(self.stats.summary(), [0.02, 0.08], 18.0, TEXT);
        if self.death_timer.is_some() {
            list.text("Washed away...", [0.5, 0.4], 40.0, TEXT);
        }

        if let Some(cursor) = self.pause_cursor {
            list.quad(
                list.camera.center_x,
                list.camera.center_y,
                WIDTH as f32,
                HEIGHT as f32,
                [0.0, 0.0, 0.0, 0.6],
            );
            list.text("Paused", [0.5, 0.3], 48.0, TEXT);
            for (i, entry) in PauseEntry::ALL.iter().enumerate() {
                let color = if i == cursor { HIGHLIGHT } else { TEXT_DIM };
                list.text(entry.label(), [0.5, 0.45 + i as f32 * 0.07], 28.0, color);
            }
        }
    }
}

/// Spikes fill the lower half of their cell.
fn hazard_box(grid: &CollisionGrid, cell: GridCell) -> Aabb {
    let full = grid.cell_aabb(cell);
    let half_h = full.half_h * 0.5;
    Aabb {
        center_x: full.center_x,
        center_y: full.bottom() + half_h,
        half_w: full.half_w * 0.8,
        half_h,
    }
}

fn push_aabb(list: &mut DrawList, aabb: &Aabb, color: Rgba) {
    list.quad(
        aabb.center_x,
        aabb.center_y,
        aabb.half_w * 2.0,
        aabb.half_h * 2.0,
        color,
    );
}

/// Keep the view inside the level; levels smaller than the view are centred.
fn follow_axis(target: f32, (min, max): (f32, f32), half_view: f32) -> f32 {
    if max - min <= half_view * 2.0 {
        (min + max) * 0.5
    } else {
        target.clamp(min + half_view, max - half_view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_file::sample_level;

    const DT: f32 = 1.0 / 60.0;

    fn new_level() -> Level {
        Level::new(
            &sample_level("1"),
            Rc::new(AudioPlayer::disabled()),
            PlayerStats::initial(),
        )
    }

    fn step_idle(level: &mut Level, frames: usize) -> Vec<Transition> {
        let input = InputState::new();
        (0..frames).filter_map(|_| level.step(&input, DT)).collect()
    }

    fn press(level: &mut Level, key: Key) -> Option<Transition> {
        let mut input = InputState::new();
        input.key_down(key);
        level.step(&input, DT)
    }

    #[test]
    fn player_spawns_on_the_floor() {
        let mut level = new_level();
        step_idle(&mut level, 30);
        assert!(level.player.grounded);
        assert!((level.player_aabb().bottom() - 32.0).abs() < 0.01);
    }

    #[test]
    fn pickups_are_consumed_once() {
        let mut level = new_level();
        let mut input = InputState::new();
        input.key_down(Key::Right);
        for _ in 0..60 {
            level.step(&input, DT);
            input.end_frame();
        }
        assert_eq!(level.stats().coins, 1);
        assert_eq!(level.stats().messages, vec!["b1".to_string()]);

        // Walking back over the same cells collects nothing new.
        input.key_up(Key::Right);
        input.key_down(Key::Left);
        for _ in 0..60 {
            level.step(&input, DT);
            input.end_frame();
        }
        assert_eq!(level.stats().coins, 1);
        assert_eq!(level.stats().messages.len(), 1);
    }

    #[test]
    fn hazard_damages_once_per_invulnerability_window() {
        let mut level = new_level();
        let hazard = level.hazards[0];
        level.player.aabb.center_x = hazard.center_x;
        level.player.aabb.center_y = hazard.bottom() + PLAYER_HALF_H;
        step_idle(&mut level, 1);
        assert_eq!(level.stats().health, 2);
        assert!(level.invulnerable > 0.0);

        level.player.aabb.center_x = hazard.center_x;
        level.player.aabb.center_y = hazard.bottom() + PLAYER_HALF_H;
        step_idle(&mut level, 1);
        assert_eq!(level.stats().health, 2);
    }

    #[test]
    fn heart_never_exceeds_max_health() {
        let mut file = sample_level("1");
        file.pickups[0].kind = PickupKind::Heart;
        let mut level = Level::new(&file, Rc::new(AudioPlayer::disabled()), PlayerStats::initial());
        let heart = level.pickups[0].aabb;
        level.player.aabb.center_x = heart.center_x;
        level.player.aabb.center_y = heart.center_y;
        step_idle(&mut level, 1);
        assert!(level.pickups[0].collected);
        assert_eq!(level.stats().health, level.stats().max_health);
    }

    #[test]
    fn falling_out_restarts_after_delay() {
        let mut level = new_level();
        level.player.aabb.center_y = -200.0;
        assert!(step_idle(&mut level, 1).is_empty());
        assert!(level.death_timer.is_some());

        let transitions = step_idle(&mut level, 200);
        assert_eq!(transitions, vec![Transition::Restart]);
    }

    #[test]
    fn touching_goal_advances_with_stats() {
        let mut level = new_level();
        level.stats.coins = 7;
        let goal = level.goal;
        level.player.aabb.center_x = goal.center_x;
        level.player.aabb.center_y = goal.center_y;

        let transitions = step_idle(&mut level, 10);
        assert_eq!(transitions.len(), 1, "goal is reported exactly once");
        match &transitions[0] {
            Transition::Advance {
                updated_player_data: Some(stats),
            } => assert_eq!(stats.coins, 7),
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[test]
    fn stomping_defeats_enemy_and_bounces() {
        let mut level = new_level();
        let enemy = level.enemies[0].aabb;
        level.player.aabb.center_x = enemy.center_x;
        level.player.aabb.center_y = enemy.top() + PLAYER_HALF_H - 2.0;
        level.player.velocity_y = -200.0;
        level.enemies[0].speed = 0.0;

        step_idle(&mut level, 1);
        assert!(!level.enemies[0].alive);
        assert!(level.player.velocity_y > 0.0);
        assert_eq!(level.stats().health, 3);
    }

    #[test]
    fn walking_into_enemy_hurts() {
        let mut level = new_level();
        let enemy = level.enemies[0].aabb;
        level.enemies[0].speed = 0.0;
        level.player.aabb.center_x = enemy.center_x - 4.0;
        level.player.aabb.center_y = enemy.bottom() + PLAYER_HALF_H;
        level.player.grounded = true;

        step_idle(&mut level, 1);
        assert!(level.enemies[0].alive);
        assert_eq!(level.stats().health, 2);
    }

    #[test]
    fn pause_menu_freezes_and_selects() {
        let mut level = new_level();
        step_idle(&mut level, 30);
        assert_eq!(press(&mut level, Key::Escape), None);
        assert!(level.is_paused());

        let before = level.player_aabb();
        let mut input = InputState::new();
        input.key_down(Key::Right);
        level.step(&input, DT);
        assert_eq!(level.player_aabb(), before);

        assert_eq!(press(&mut level, Key::Down), None);
        assert_eq!(press(&mut level, Key::Down), None);
        assert_eq!(
            press(&mut level, Key::Enter),
            Some(Transition::SaveAndReturnToTitle)
        );
    }

    #[test]
    fn pause_menu_entries_map_to_transitions() {
        let cases = [
            (1, Some(Transition::Restart)),
            (3, Some(Transition::ReturnToTitle)),
        ];
        for (downs, expected) in cases {
            let mut level = new_level();
            press(&mut level, Key::Escape);
            for _ in 0..downs {
                press(&mut level, Key::S);
            }
            assert_eq!(press(&mut level, Key::Space), expected);
        }

        let mut level = new_level();
        press(&mut level, Key::Escape);
        assert_eq!(press(&mut level, Key::Enter), None, "Resume closes the menu");
        assert!(!level.is_paused());
        press(&mut level, Key::Escape);
        press(&mut level, Key::Escape);
        assert!(!level.is_paused());
    }

    #[test]
    fn draw_follows_player_within_bounds() {
        let mut level = new_level();
        let mut list = DrawList::new();
        level.draw(&mut list);
        assert!(list.quads.len() > level.grid.solid_count());
        assert!(list.texts.iter().any(|t| t.text.contains("HP 3/3")));

        // The sample level is narrower than the view, so the camera is centred.
        let (min_x, max_x) = level.grid.horizontal_bounds();
        assert_eq!(list.camera.center_x, (min_x + max_x) * 0.5);
        level.stats.health = 1;
        list.clear();
        level.draw(&mut list);
        assert!(list.texts.iter().any(|t| t.text.contains("HP 1/3")));
    }

    #[test]
    fn follow_axis_clamps_to_level_edges() {
        assert_eq!(follow_axis(0.0, (0.0, 2000.0), 640.0), 640.0);
        assert_eq!(follow_axis(1000.0, (0.0, 2000.0), 640.0), 1000.0);
        assert_eq!(follow_axis(1990.0, (0.0, 2000.0), 640.0), 1360.0);
        assert_eq!(follow_axis(50.0, (0.0, 300.0), 640.0), 150.0);
    }
}
