//! Message in a Bottle -- entry point and frame loop.
//!
//! winit drives the event loop via `ApplicationHandler`. Each redraw runs the
//! fixed-timestep model from `TimeState`:
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- step the `Game` once per fixed slice
//!   3. Let the active state fill the draw list, clear to black, draw quads
//!   4. Composite HUD text and the debug window through egui, present
//!
//! Between frames the loop sleeps until `next_frame_deadline()`, so the frame
//! rate never exceeds `FPS`.

mod audio;
mod collision;
mod controller;
mod error;
mod game;
mod intro;
mod level;
mod level_file;
#[cfg(test)]
mod replay;
mod save;
mod settings;
mod stats;
mod title;
mod transition;

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use audio::AudioPlayer;
use game::{ActiveState, Game};
use level_file::LevelCatalog;
use mib_core::draw::DrawList;
use mib_core::input::{InputState, Key};
use mib_core::time::TimeState;
use mib_overlay::{Overlay, OverlayStats};
use mib_platform::window::PlatformConfig;
use mib_render::{Camera2D, GpuContext, QuadRenderer};
use save::SaveStore;
use settings::{DEFAULT_ASSET_DIR, DEFAULT_SAVE_PATH, FPS, HEIGHT, TITLE, WIDTH};
use transition::Flow;

#[derive(Parser, Debug)]
#[command(name = "message_in_a_bottle", version, about = "A small 2D platformer")]
struct Cli {
    /// Index into the level list to start at (0 title, 1 intro, 2.. levels)
    #[arg(long)]
    level: Option<usize>,

    /// Play background music
    #[arg(long)]
    music: bool,

    /// Play sound effects
    #[arg(long)]
    soundfx: bool,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Save file location
    #[arg(long, default_value = DEFAULT_SAVE_PATH)]
    save: PathBuf,

    /// Asset root containing levels/ and audio/
    #[arg(long, default_value = DEFAULT_ASSET_DIR)]
    assets: PathBuf,
}

/// Window and GPU state. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    quads: QuadRenderer,
    overlay: Overlay,
    draw_list: DrawList,
    /// Set from the debug window; stops game steps while still rendering.
    frozen: bool,
}

impl EngineState {
    fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gpu = GpuContext::new(window.clone()).context("failed to initialise GPU")?;
        let camera = Camera2D::new(gpu.size.0, gpu.size.1);
        let quads = QuadRenderer::new(&gpu.device, gpu.surface_format, &camera);
        let overlay = Overlay::new(&gpu.device, gpu.surface_format, &window);
        Ok(Self {
            window,
            gpu,
            time: TimeState::new(FPS),
            input: InputState::new(),
            camera,
            quads,
            overlay,
            draw_list: DrawList::new(),
            frozen: false,
        })
    }
}

struct App {
    config: PlatformConfig,
    game: Game,
    state: Option<EngineState>,
    exit_error: Option<anyhow::Error>,
}

impl App {
    fn new(game: Game) -> Self {
        Self {
            config: PlatformConfig {
                title: TITLE.to_string(),
                width: WIDTH,
                height: HEIGHT,
                ..Default::default()
            },
            game,
            state: None,
            exit_error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.exit_error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
            return;
        }

        // Fixed-step simulation phase.
        state.time.begin_frame();
        let dt = state.time.fixed_dt as f32;
        while state.time.should_step() {
            if state.input.is_just_pressed(Key::F3) {
                state.overlay.toggle_debug();
            }
            let flow = if state.frozen {
                Ok(Flow::Continue)
            } else {
                self.game.step(&state.input, dt)
            };
            // Edges are consumed by the step that saw them.
            state.input.end_frame();
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => {
                    log::info!("Game finished, exiting.");
                    event_loop.exit();
                    return;
                }
                Err(err) => {
                    self.fail(event_loop, err.into());
                    return;
                }
            }
        }

        // Render phase reads finalized simulation state from this frame.
        state.draw_list.clear();
        self.game.draw(&mut state.draw_list);
        state.camera.apply_view(&state.draw_list.camera);
        // States lay out the world for the logical window size.
        state.camera.zoom *= state.gpu.size.0 as f32 / WIDTH as f32;
        state.quads.prepare(
            &state.gpu.device,
            &state.gpu.queue,
            &state.camera,
            &state.draw_list,
        );

        let Some((output, view)) = state.gpu.begin_frame() else {
            return;
        };

        let stats = overlay_stats(&self.game, state);
        let (egui_primitives, egui_textures_delta, overlay_actions) = state.overlay.prepare(
            &state.window,
            &state.time,
            &state.draw_list.texts,
            Some(stats),
        );

        if overlay_actions.toggle_pause {
            state.frozen = !state.frozen;
            log::info!("Simulation {}", if state.frozen { "FROZEN" } else { "RESUMED" });
        }
        let mut action_result = Ok(Flow::Continue);
        if overlay_actions.restart_level {
            action_result = self.game.restart_level().map(|()| Flow::Continue);
        } else if overlay_actions.skip_level {
            action_result = self.game.advance_to_next_level(None);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
            pixels_per_point: state.window.scale_factor() as f32,
        };

        let mut encoder = state
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            state.quads.draw(&mut render_pass);
        }

        state.overlay.upload(
            &state.gpu.device,
            &state.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            state
                .overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        state.overlay.cleanup(&egui_textures_delta);

        state.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        match action_result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => {
                log::info!("Skipped past the last level, exiting.");
                event_loop.exit();
            }
            Err(err) => self.fail(event_loop, err.into()),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = match mib_platform::window::create_window(event_loop, &self.config) {
            Ok(window) => window,
            Err(err) => {
                self.fail(event_loop, anyhow::Error::new(err).context("failed to create window"));
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        match EngineState::new(window) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            if let Some(state) = &self.state {
                state.window.request_redraw();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            event_loop.set_control_flow(ControlFlow::WaitUntil(state.time.next_frame_deadline()));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                // Key-up events for keys held while unfocused never arrive.
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

fn overlay_stats(game: &Game, state: &EngineState) -> OverlayStats {
    let state_label = match game.active() {
        ActiveState::Level(level) if level.is_paused() => {
            format!("Level {} (paused)", level.level_id())
        }
        ActiveState::Level(level) => format!("Level {}", level.level_id()),
        other => other.label().to_string(),
    };
    let player_summary = match game.active() {
        ActiveState::Level(level) => level.stats().summary(),
        _ => game.player_data().summary(),
    };
    OverlayStats {
        state_label,
        level_index: game.level_index(),
        level_count: game.level_count(),
        player_summary,
        quad_count: state.quads.quad_count(),
        music_label: game.audio().status_label(),
        sound_fx_enabled: game.audio().sound_fx_enabled(),
        paused: state.frozen,
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(Key::Enter),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("{TITLE} starting...");

    let audio = AudioPlayer::new(cli.music, cli.soundfx, &cli.assets)
        .context("failed to initialise audio")?;
    let catalog = LevelCatalog::load_dir(&cli.assets).context("failed to load levels")?;
    log::info!("Loaded {} levels from {}", catalog.len(), cli.assets.display());
    let saves = SaveStore::new(cli.save);
    log::info!("Save file: {}", saves.path().display());
    let game = Game::new(cli.level, Rc::new(audio), catalog, saves)
        .context("failed to start game")?;
    game.start().context("failed to start music")?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(game);
    event_loop.run_app(&mut app).context("event loop error")?;
    app.game.audio().stop_music();

    match app.exit_error {
        Some(err) => Err(err),
        None => {
            log::info!("Goodbye.");
            Ok(())
        }
    }
}
