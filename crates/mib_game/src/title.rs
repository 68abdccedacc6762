use std::rc::Rc;

use serde_json::Value;

use mib_core::draw::{DrawList, Rgba};
use mib_core::input::{InputState, Key};

use crate::audio::{AudioPlayer, SoundEffect};
use crate::settings::{TITLE, WIDTH};
use crate::stats::PlayerStats;
use crate::transition::Transition;

const MENU_UP: &[Key] = &[Key::Up, Key::W];
const MENU_DOWN: &[Key] = &[Key::Down, Key::S];
const MENU_SELECT: &[Key] = &[Key::Enter, Key::Space];

const WAVE: Rgba = [0.1, 0.35, 0.6, 1.0];
const WAVE_FAR: Rgba = [0.06, 0.2, 0.4, 1.0];
const TEXT: Rgba = [1.0, 1.0, 1.0, 1.0];
const TEXT_DIM: Rgba = [0.6, 0.6, 0.65, 1.0];
const TEXT_DISABLED: Rgba = [0.3, 0.3, 0.33, 1.0];
const HIGHLIGHT: Rgba = [1.0, 0.85, 0.3, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    NewGame,
    Continue,
}

impl MenuEntry {
    const ALL: [MenuEntry; 2] = [MenuEntry::NewGame, MenuEntry::Continue];

    fn label(self) -> &'static str {
        match self {
            MenuEntry::NewGame => "New Game",
            MenuEntry::Continue => "Continue",
        }
    }
}

pub struct TitleScreen {
    audio: Rc<AudioPlayer>,
    saved_data: Option<Value>,
    cursor: usize,
    elapsed: f32,
}

impl TitleScreen {
    /// `saved_data` is the raw save blob, if one exists; it enables Continue.
    pub fn new(audio: Rc<AudioPlayer>, saved_data: Option<Value>) -> Self {
        Self {
            audio,
            saved_data,
            cursor: 0,
            elapsed: 0.0,
        }
    }

    pub fn can_continue(&self) -> bool {
        self.saved_data.is_some()
    }

    pub fn selected(&self) -> MenuEntry {
        MenuEntry::ALL[self.cursor]
    }

    fn enabled(&self, entry: MenuEntry) -> bool {
        entry != MenuEntry::Continue || self.can_continue()
    }

    fn move_cursor(&mut self, delta: isize) {
        let count = MenuEntry::ALL.len() as isize;
        let mut next = self.cursor as isize;
        for _ in 0..count {
            next = (next + delta).rem_euclid(count);
            if self.enabled(MenuEntry::ALL[next as usize]) {
                break;
            }
        }
        let next = next as usize;
        if next != self.cursor {
            self.cursor = next;
            self.audio.play_effect(SoundEffect::MenuMove);
        }
    }

    pub fn step(&mut self, input: &InputState, dt: f32) -> Option<Transition> {
        self.elapsed += dt;
        if input.any_just_pressed(MENU_UP) {
            self.move_cursor(-1);
        }
        if input.any_just_pressed(MENU_DOWN) {
            self.move_cursor(1);
        }
        if !input.any_just_pressed(MENU_SELECT) {
            return None;
        }

        self.audio.play_effect(SoundEffect::MenuSelect);
        match self.selected() {
            MenuEntry::NewGame => {
                log::info!("Starting a new game");
                Some(Transition::advance_with(PlayerStats::initial()))
            }
            MenuEntry::Continue => self.saved_data.clone().map(|saved| {
                log::info!("Continuing from save");
                Transition::Resume(saved)
            }),
        }
    }

    pub fn draw(&self, list: &mut DrawList) {
        // Two bands of waves scrolling at different speeds.
        let width = WIDTH as f32;
        for (band, (y, speed, color)) in [(-220.0, 30.0, WAVE_FAR), (-290.0, 55.0, WAVE)]
            .into_iter()
            .enumerate()
        {
            let crest = 80.0;
            let offset = (self.elapsed * speed) % crest;
            let mut x = -width * 0.5 - crest + offset;
            while x < width * 0.5 + crest {
                let bob = ((x * 0.02) + self.elapsed * (1.5 + band as f32)).sin() * 6.0;
                list.quad(x, y + bob, crest * 0.9, 24.0, color);
                x += crest;
            }
            list.quad(0.0, y - 80.0, width, 140.0, color);
        }

        list.text(TITLE, [0.5, 0.25], 56.0, TEXT);
        for (i, entry) in MenuEntry::ALL.iter().enumerate() {
            let color = if !self.enabled(*entry) {
                TEXT_DISABLED
            } else if i == self.cursor {
                HIGHLIGHT
            } else {
                TEXT_DIM
            };
            list.text(entry.label(), [0.5, 0.5 + i as f32 * 0.08], 32.0, color);
        }
    }
}
