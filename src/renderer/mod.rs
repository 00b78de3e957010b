//! Drawing capability consumed by render systems, plus a headless recorder.

use std::collections::HashMap;

use crate::geometry::Rect;

// ── Color ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    pub const RED: Self = Self([1.0, 0.0, 0.0, 1.0]);
    pub const GREEN: Self = Self([0.0, 1.0, 0.0, 1.0]);
    pub const BLUE: Self = Self([0.0, 0.0, 1.0, 1.0]);
    pub const TRANSPARENT: Self = Self([0.0, 0.0, 0.0, 0.0]);
}

impl From<[f32; 4]> for Color {
    fn from(rgba: [f32; 4]) -> Self {
        Self(rgba)
    }
}

/// Handle of a texture owned by the renderer backend.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

// ── Renderer trait ──────────────────────────────────────────────────────────

/// Backend-agnostic drawing surface. All rectangles are in screen pixels.
pub trait Renderer {
    /// Width in pixels, or 0 for an unknown texture.
    fn texture_width(&self, texture: TextureId) -> u32;
    /// Height in pixels, or 0 for an unknown texture.
    fn texture_height(&self, texture: TextureId) -> u32;
    fn has_texture(&self, texture: TextureId) -> bool;

    fn clear(&mut self, color: Color);
    /// Copies `src` (the whole texture when `None`) into `dst`, rotated by
    /// `rotation` degrees around the centre of `dst`.
    fn draw_texture(&mut self, texture: TextureId, src: Option<Rect>, dst: Rect, rotation: f32);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Outline only.
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn present(&mut self);
}

// ── RecordingRenderer ───────────────────────────────────────────────────────

/// One recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Texture {
        texture: TextureId,
        src: Option<Rect>,
        dst: Rect,
        rotation: f32,
    },
    Fill(Rect, Color),
    Outline(Rect, Color),
}

/// Headless renderer that remembers every draw call of the current frame.
///
/// Texture sizes are registered up front with [`with_texture`](Self::with_texture).
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    textures: HashMap<TextureId, (u32, u32)>,
    commands: Vec<DrawCommand>,
    last_frame: Vec<DrawCommand>,
    frames: u64,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture(mut self, texture: TextureId, width: u32, height: u32) -> Self {
        self.add_texture(texture, width, height);
        self
    }

    pub fn add_texture(&mut self, texture: TextureId, width: u32, height: u32) {
        self.textures.insert(texture, (width, height));
    }

    /// Calls recorded since the last [`present`](Renderer::present).
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Calls of the most recently presented frame.
    pub fn last_frame(&self) -> &[DrawCommand] {
        &self.last_frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Destinations of every texture draw in the pending frame, in draw order.
    pub fn texture_draws(&self) -> Vec<(TextureId, Rect)> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Texture { texture, dst, .. } => Some((*texture, *dst)),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn texture_width(&self, texture: TextureId) -> u32 {
        self.textures.get(&texture).map_or(0, |&(w, _)| w)
    }

    fn texture_height(&self, texture: TextureId) -> u32 {
        self.textures.get(&texture).map_or(0, |&(_, h)| h)
    }

    fn has_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_texture(&mut self, texture: TextureId, src: Option<Rect>, dst: Rect, rotation: f32) {
        self.commands.push(DrawCommand::Texture {
            texture,
            src,
            dst,
            rotation,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Fill(rect, color));
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Outline(rect, color));
    }

    fn present(&mut self) {
        self.last_frame = std::mem::take(&mut self.commands);
        self.frames += 1;
    }
}
