//! Background music and sound effects over rodio.
//!
//! The player is created once by `main` and handed to every state as an
//! `Rc<AudioPlayer>`. All methods take `&self`; the music sink lives in a
//! `RefCell` so a state can switch tracks without owning the player.
//!
//! The output device is opened only when music or effects are enabled, so a
//! silent run never touches the audio backend. Effects are decoded once at
//! startup to surface missing or corrupt files before the first frame.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::settings::{MUSIC_TRACKS, MUSIC_VOLUME, SOUND_EFFECTS, SOUND_FX_VOLUME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    Jump,
    Coin,
    Heart,
    Bottle,
    Hurt,
    Stomp,
    Goal,
    MenuMove,
    MenuSelect,
}

impl SoundEffect {
    #[cfg(test)]
    pub const ALL: &'static [SoundEffect] = &[
        SoundEffect::Jump,
        SoundEffect::Coin,
        SoundEffect::Heart,
        SoundEffect::Bottle,
        SoundEffect::Hurt,
        SoundEffect::Stomp,
        SoundEffect::Goal,
        SoundEffect::MenuMove,
        SoundEffect::MenuSelect,
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to open audio output: {0}")]
    Output(#[from] rodio::StreamError),
    #[error("failed to create audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("failed to read audio file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode audio file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error("no music track with index {0}")]
    UnknownSong(usize),
}

struct AudioOutput {
    // Dropping the stream silences every sink, so it lives as long as the player.
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

pub struct AudioPlayer {
    with_music: bool,
    with_sound_fx: bool,
    output: Option<AudioOutput>,
    music_tracks: Vec<PathBuf>,
    effects: HashMap<SoundEffect, Arc<[u8]>>,
    music_sink: RefCell<Option<Sink>>,
    current_song: Cell<Option<usize>>,
}

impl AudioPlayer {
    pub fn new(with_music: bool, with_sound_fx: bool, asset_dir: &Path) -> Result<Self, AudioError> {
        let music_tracks = MUSIC_TRACKS.iter().map(|t| asset_dir.join(t)).collect();
        if !with_music && !with_sound_fx {
            log::info!("Audio disabled (no --music or --soundfx)");
            return Ok(Self::silent(music_tracks));
        }

        let (stream, handle) = OutputStream::try_default()?;
        let mut effects = HashMap::new();
        if with_sound_fx {
            for (effect, relative) in SOUND_EFFECTS {
                let path = asset_dir.join(relative);
                effects.insert(*effect, preload_effect(&path)?);
            }
            log::info!("Loaded {} sound effects", effects.len());
        }

        log::info!(
            "Audio ready (music: {}, sound fx: {})",
            if with_music { "on" } else { "off" },
            if with_sound_fx { "on" } else { "off" }
        );
        Ok(Self {
            with_music,
            with_sound_fx,
            output: Some(AudioOutput {
                _stream: stream,
                handle,
            }),
            music_tracks,
            effects,
            music_sink: RefCell::new(None),
            current_song: Cell::new(None),
        })
    }

    /// A player that never opens an output device.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::silent(Vec::new())
    }

    fn silent(music_tracks: Vec<PathBuf>) -> Self {
        Self {
            with_music: false,
            with_sound_fx: false,
            output: None,
            music_tracks,
            effects: HashMap::new(),
            music_sink: RefCell::new(None),
            current_song: Cell::new(None),
        }
    }

    pub fn music_enabled(&self) -> bool {
        self.with_music
    }

    pub fn sound_fx_enabled(&self) -> bool {
        self.with_sound_fx
    }

    pub fn current_song(&self) -> Option<usize> {
        self.current_song.get()
    }

    /// Loop track `index` on the music sink, replacing whatever was playing.
    /// A no-op when music is disabled.
    pub fn play_song(&self, index: usize) -> Result<(), AudioError> {
        if !self.with_music {
            return Ok(());
        }
        let Some(output) = &self.output else {
            return Ok(());
        };
        let path = self
            .music_tracks
            .get(index)
            .ok_or(AudioError::UnknownSong(index))?;
        let source = open_track(path)?;

        let sink = Sink::try_new(&output.handle)?;
        sink.set_volume(MUSIC_VOLUME);
        sink.append(source.repeat_infinite());
        if let Some(previous) = self.music_sink.replace(Some(sink)) {
            previous.stop();
        }
        self.current_song.set(Some(index));
        log::info!("Playing song {index}: {}", path.display());
        Ok(())
    }

    pub fn stop_music(&self) {
        if let Some(sink) = self.music_sink.borrow_mut().take() {
            sink.stop();
            log::info!("Music stopped");
        }
        self.current_song.set(None);
    }

    /// Fire-and-forget effect playback. Failures are logged, never fatal.
    pub fn play_effect(&self, effect: SoundEffect) {
        if !self.with_sound_fx {
            return;
        }
        let (Some(output), Some(bytes)) = (&self.output, self.effects.get(&effect)) else {
            return;
        };
        let source = match Decoder::new(Cursor::new(Arc::clone(bytes))) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("Failed to decode sound effect {effect:?}: {err}");
                return;
            }
        };
        match Sink::try_new(&output.handle) {
            Ok(sink) => {
                sink.set_volume(SOUND_FX_VOLUME);
                sink.append(source);
                sink.detach();
                log::debug!("Sound effect {effect:?}");
            }
            Err(err) => log::warn!("Failed to play sound effect {effect:?}: {err}"),
        }
    }

    pub fn status_label(&self) -> String {
        match (self.music_enabled(), self.current_song()) {
            (false, _) => "Music: off".to_string(),
            (true, Some(index)) => format!("Music: track {index}"),
            (true, None) => "Music: idle".to_string(),
        }
    }
}

fn open_track(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn preload_effect(path: &Path) -> Result<Arc<[u8]>, AudioError> {
    let bytes: Arc<[u8]> = fs::read(path)
        .map_err(|source| AudioError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .into();
    Decoder::new(Cursor::new(Arc::clone(&bytes))).map_err(|source| AudioError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}
