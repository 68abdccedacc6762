//! Per-frame draw description produced by game states.
//!
//! States never touch the GPU. Each frame they append world-space quads and
//! screen-space text to a `DrawList`; the frame loop turns quads into a mesh for
//! the quad pipeline and hands text to the egui overlay.

pub type Rgba = [f32; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// Text anchored in normalized screen space: (0, 0) is the top-left corner,
/// (1, 1) the bottom-right.
#[derive(Debug, Clone, PartialEq)]
pub struct HudText {
    pub text: String,
    pub anchor: [f32; 2],
    pub size: f32,
    pub color: Rgba,
    pub align: TextAlign,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub center_x: f32,
    pub center_y: f32,
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub camera: CameraView,
    pub quads: Vec<Quad>,
    pub texts: Vec<HudText>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.camera = CameraView::default();
        self.quads.clear();
        self.texts.clear();
    }

    pub fn quad(&mut self, center_x: f32, center_y: f32, width: f32, height: f32, color: Rgba) {
        self.quads.push(Quad {
            center_x,
            center_y,
            width,
            height,
            color,
        });
    }

    pub fn text(&mut self, text: impl Into<String>, anchor: [f32; 2], size: f32, color: Rgba) {
        self.texts.push(HudText {
            text: text.into(),
            anchor,
            size,
            color,
            align: TextAlign::Center,
        });
    }

    pub fn text_left(&mut self, text: impl Into<String>, anchor: [f32; 2], size: f32, color: Rgba) {
        self.texts.push(HudText {
            text: text.into(),
            anchor,
            size,
            color,
            align: TextAlign::Left,
        });
    }
}

/// Scale the alpha channel of a colour, clamping the factor to `[0, 1]`.
pub fn with_alpha(color: Rgba, factor: f32) -> Rgba {
    [color[0], color[1], color[2], color[3] * factor.clamp(0.0, 1.0)]
}
