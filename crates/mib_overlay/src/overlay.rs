//! egui layer drawn on top of the quad scene.
//!
//! It has two jobs: paint the active state's HUD text every frame, and show a
//! debug window when toggled with F3. egui needs a three-phase render split
//! because `egui_wgpu::Renderer::render()` wants a `RenderPass<'static>` while
//! `begin_render_pass` borrows the encoder:
//!
//!   1. `prepare()` -- run UI logic, tessellate primitives
//!   2. `upload()`  -- upload textures and buffers (borrows encoder mutably)
//!   3. `paint()`   -- render into a pass created with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references

use mib_core::draw::{HudText, Rgba, TextAlign};
use mib_core::time::TimeState;
use winit::window::Window;

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    /// Active state label, e.g. "Level 2"
    pub state_label: String,
    pub level_index: usize,
    pub level_count: usize,
    /// One-line player stats summary
    pub player_summary: String,
    pub quad_count: u32,
    /// e.g. "Music: track 0"
    pub music_label: String,
    pub sound_fx_enabled: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    pub skip_level: bool,
    pub restart_level: bool,
    pub toggle_pause: bool,
}

pub struct Overlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub debug_visible: bool,
}

impl Overlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            debug_visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle_debug(&mut self) {
        self.debug_visible = !self.debug_visible;
        log::info!(
            "Debug overlay: {}",
            if self.debug_visible { "ON" } else { "OFF" }
        );
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        texts: &[HudText],
        stats: Option<OverlayStats>,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let debug_visible = self.debug_visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            paint_hud(ctx, texts);

            if !debug_visible {
                return;
            }
            egui::Window::new("Debug")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {:.1}", time.smoothed_fps));
                    ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
                    ui.label(format!("Steps this frame: {}", time.steps_this_frame));
                    ui.label(format!("Total steps: {}", time.fixed_step_count));
                    let Some(ref stats) = stats else {
                        return;
                    };
                    ui.separator();
                    ui.label(format!(
                        "State: {} ({}/{})",
                        stats.state_label,
                        stats.level_index,
                        stats.level_count.saturating_sub(1)
                    ));
                    ui.label(&stats.player_summary);
                    ui.label(format!("Quads: {}", stats.quad_count));
                    ui.label(&stats.music_label);
                    ui.label(format!(
                        "Sound fx: {}",
                        if stats.sound_fx_enabled { "on" } else { "off" }
                    ));

                    ui.separator();
                    ui.horizontal(|ui| {
                        let pause_label = if stats.paused { "Resume" } else { "Freeze" };
                        if ui.button(pause_label).clicked() {
                            actions.toggle_pause = true;
                        }
                        if ui.button("Restart").clicked() {
                            actions.restart_level = true;
                        }
                        if ui.button("Skip").clicked() {
                            actions.skip_level = true;
                        }
                    });
                    if stats.paused {
                        ui.label("\u{23f8} FROZEN");
                    }
                });
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn paint_hud(ctx: &egui::Context, texts: &[HudText]) {
    if texts.is_empty() {
        return;
    }
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("hud_text"),
    ));
    let screen = ctx.screen_rect();
    for text in texts {
        let pos = screen.min
            + egui::vec2(
                screen.width() * text.anchor[0],
                screen.height() * text.anchor[1],
            );
        let align = match text.align {
            TextAlign::Left => egui::Align2::LEFT_CENTER,
            TextAlign::Center => egui::Align2::CENTER_CENTER,
        };
        painter.text(
            pos,
            align,
            &text.text,
            egui::FontId::proportional(text.size),
            to_color32(text.color),
        );
    }
}

fn to_color32(color: Rgba) -> egui::Color32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        channel(color[3]),
    )
}
