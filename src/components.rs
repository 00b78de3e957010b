//! Gameplay components and tag markers understood by the built-in systems.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ecs::Entity;
use crate::geometry::Rect;
use crate::renderer::TextureId;

// ── Enums ───────────────────────────────────────────────────────────────────

/// Draw priority. Lower variants are drawn first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderOrder {
    BaseTile,
    TopTile,
    Npc,
    Player,
    Projectile,
    #[default]
    Unset,
}

/// Who fired a projectile.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProjectileOwner {
    Player,
    Npc,
    #[default]
    Unset,
}

// ── Components ──────────────────────────────────────────────────────────────

/// Missing fields fall back to [`Transform::default`] when deserialized.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Top-left corner in world pixels.
    pub position: Vec2,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    /// World-space box of `width`×`height` unscaled pixels anchored at this transform.
    pub fn bounds(&self, width: f32, height: f32) -> Rect {
        Rect::from_f32(
            self.position.x,
            self.position.y,
            width * self.scale.x,
            height * self.scale.y,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

/// Pixels per second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

impl Velocity {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub texture: TextureId,
    pub order: RenderOrder,
}

/// Sprite-sheet animation. Columns are frames, rows are directions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Animation {
    pub frame_width: u32,
    pub frame_height: u32,
    pub rows: u32,
    pub columns: u32,
    pub current_row: u32,
    pub current_column: u32,
    /// Milliseconds each frame stays on screen.
    pub frame_ms: u64,
    pub last_update_ms: u64,
}

impl Animation {
    pub fn new(frame_width: u32, frame_height: u32, rows: u32, columns: u32, frame_ms: u64) -> Self {
        Self {
            frame_width,
            frame_height,
            rows,
            columns,
            frame_ms,
            ..Self::default()
        }
    }

    /// Region of the sheet holding the current frame.
    pub fn source_rect(&self) -> Rect {
        Rect::new(
            (self.current_column * self.frame_width) as i32,
            (self.current_row * self.frame_height) as i32,
            self.frame_width as i32,
            self.frame_height as i32,
        )
    }
}

/// Axis-aligned box in unscaled pixels, anchored at the transform position.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Health {
    pub max: i32,
    pub current: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { max, current: max }
    }

    /// Remaining fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            return 0.0;
        }
        (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Viewport size of a camera entity, in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraView {
    pub width: u32,
    pub height: u32,
}

/// A cell cut out of a tile sheet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tile {
    pub source: Rect,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerController {
    pub speed: f32,
}

/// Fires projectiles no faster than every `cadence_ms`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Weapon {
    pub cadence_ms: u64,
    pub last_emission_ms: Option<u64>,
    pub damage: i32,
    pub owner: ProjectileOwner,
}

impl Weapon {
    pub fn ready(&self, now_ms: u64) -> bool {
        self.last_emission_ms
            .is_none_or(|last| now_ms >= last + self.cadence_ms)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Projectile {
    pub damage: i32,
    pub owner: ProjectileOwner,
    pub shooter: Entity,
}

// ── Tags ────────────────────────────────────────────────────────────────────

pub struct Player;
pub struct Npc;
pub struct ProjectileTag;
pub struct Scenery;
pub struct MainCamera;
