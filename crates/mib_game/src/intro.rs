use mib_core::draw::{with_alpha, DrawList, Rgba};

use crate::settings::WIDTH;
use crate::transition::Transition;

const FADE_SECONDS: f32 = 0.6;
const TEXT: Rgba = [0.95, 0.92, 0.85, 1.0];
const SEA: Rgba = [0.04, 0.12, 0.25, 1.0];

pub struct Caption {
    pub text: &'static str,
    pub seconds: f32,
}

pub const CAPTIONS: &[Caption] = &[
    Caption {
        text: "The storm took the lighthouse keeper's boat.",
        seconds: 3.0,
    },
    Caption {
        text: "Along the shore, bottles wash up one by one.",
        seconds: 3.0,
    },
    Caption {
        text: "Each holds part of a message.",
        seconds: 2.5,
    },
    Caption {
        text: "Find them all.",
        seconds: 2.0,
    },
];

/// Timed caption sequence shown between the title screen and the first level.
pub struct IntroScreen {
    elapsed: f32,
    done: bool,
}

impl IntroScreen {
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            done: false,
        }
    }

    pub fn total_seconds() -> f32 {
        CAPTIONS.iter().map(|c| c.seconds).sum()
    }

    pub fn step(&mut self, dt: f32) -> Option<Transition> {
        if self.done {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= Self::total_seconds() {
            self.done = true;
            log::info!("Intro finished");
            return Some(Transition::advance());
        }
        None
    }

    /// Index of the visible caption and how far into it we are, in seconds.
    fn current(&self) -> Option<(usize, f32)> {
        let mut start = 0.0;
        for (i, caption) in CAPTIONS.iter().enumerate() {
            if self.elapsed < start + caption.seconds {
                return Some((i, self.elapsed - start));
            }
            start += caption.seconds;
        }
        None
    }

    pub fn draw(&self, list: &mut DrawList) {
        list.quad(0.0, -260.0, WIDTH as f32, 200.0, SEA);
        let Some((index, into)) = self.current() else {
            return;
        };
        let caption = &CAPTIONS[index];
        let fade_in = into / FADE_SECONDS;
        let fade_out = (caption.seconds - into) / FADE_SECONDS;
        list.text(
            caption.text,
            [0.5, 0.45],
            30.0,
            with_alpha(TEXT, fade_in.min(fade_out)),
        );
    }
}

impl Default for IntroScreen {
    fn default() -> Self {
        Self::new()
    }
}
