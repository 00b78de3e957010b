//! Built-in gameplay systems for a top-down sprite game.
//!
//! Each system declares its required components in `new` and touches only the
//! entities the registry has matched against that signature.

mod animation;
mod bounds;
mod camera;
mod collision;
mod movement;
mod player;
mod render;

pub use animation::AnimationSystem;
pub use bounds::BoundsSystem;
pub use camera::CameraFollowSystem;
pub use collision::CollisionSystem;
pub use movement::MovementSystem;
pub use player::{PlayerControllerSystem, ProjectileTemplate};
pub use render::TextureRenderSystem;

use glam::Vec2;

use crate::components::{Animation, Collider, Transform};
use crate::ecs::{Entity, Registry};

/// On-screen size of an entity in world pixels, scale applied.
///
/// Animated entities use their frame size; anything else falls back to its
/// collider, then to zero.
pub(crate) fn footprint(registry: &Registry, entity: Entity) -> Vec2 {
    let scale = registry
        .try_get_component::<Transform>(entity)
        .map_or(Vec2::ONE, |t| t.scale);
    let size = if let Some(anim) = registry.try_get_component::<Animation>(entity) {
        Vec2::new(anim.frame_width as f32, anim.frame_height as f32)
    } else if let Some(collider) = registry.try_get_component::<Collider>(entity) {
        Vec2::new(collider.width, collider.height)
    } else {
        Vec2::ZERO
    };
    size * scale
}
