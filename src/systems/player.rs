use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use glam::Vec2;

use crate::components::{
    Animation, Collider, PlayerController, Projectile, ProjectileTag, RenderOrder, Sprite,
    Transform, Velocity, Weapon,
};
use crate::ecs::{Entity, Priority, Registry, System, SystemBase};
use crate::events::{KeyDownEvent, KeyUpEvent};
use crate::input::KeyCode;
use crate::renderer::TextureId;

/// What a fired projectile looks like and how fast it flies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectileTemplate {
    pub texture: TextureId,
    pub size: Vec2,
    pub speed: f32,
}

impl Default for ProjectileTemplate {
    fn default() -> Self {
        Self {
            texture: TextureId::default(),
            size: Vec2::splat(4.0),
            speed: 200.0,
        }
    }
}

// Sprite-sheet rows by facing.
const ROW_UP: u32 = 0;
const ROW_RIGHT: u32 = 1;
const ROW_DOWN: u32 = 2;
const ROW_LEFT: u32 = 3;

/// Steers player-controlled entities from the keyboard.
///
/// Held keys are tracked from [`KeyDownEvent`]/[`KeyUpEvent`]. One direction wins per
/// frame (up, down, right, left in that order); no key means standing still.
/// Holding space fires the entity's [`Weapon`] while it is moving.
pub struct PlayerControllerSystem {
    base: SystemBase,
    held: Rc<RefCell<HashSet<KeyCode>>>,
    projectile: ProjectileTemplate,
    clock_ms: f64,
    subscribed: bool,
}

impl PlayerControllerSystem {
    pub fn new(projectile: ProjectileTemplate) -> Self {
        Self {
            base: SystemBase::new("player-controller")
                .require::<Transform>()
                .require::<Velocity>()
                .require::<Animation>()
                .require::<PlayerController>(),
            held: Rc::new(RefCell::new(HashSet::new())),
            projectile,
            clock_ms: 0.0,
            subscribed: false,
        }
    }

    fn is_held(&self, keys: &[KeyCode]) -> bool {
        let held = self.held.borrow();
        keys.iter().any(|key| held.contains(key))
    }

    fn direction(&self) -> Vec2 {
        if self.is_held(&[KeyCode::KeyW, KeyCode::ArrowUp]) {
            Vec2::NEG_Y
        } else if self.is_held(&[KeyCode::KeyS, KeyCode::ArrowDown]) {
            Vec2::Y
        } else if self.is_held(&[KeyCode::KeyD, KeyCode::ArrowRight]) {
            Vec2::X
        } else if self.is_held(&[KeyCode::KeyA, KeyCode::ArrowLeft]) {
            Vec2::NEG_X
        } else {
            Vec2::ZERO
        }
    }

    fn fire(&self, registry: &mut Registry, shooter: Entity, weapon: &Weapon, heading: Vec2) {
        let transform = *registry.get_component::<Transform>(shooter);
        let anim = registry.get_component::<Animation>(shooter);
        let half_sprite = Vec2::new(anim.frame_width as f32, anim.frame_height as f32) * transform.scale / 2.0;
        let half_projectile = self.projectile.size * transform.scale / 2.0;

        let projectile = registry.create_entity();
        let spawn = Transform {
            position: transform.position + half_sprite - half_projectile,
            rotation: transform.rotation,
            scale: transform.scale,
        };
        registry.add_component(projectile, spawn, Priority::Deferred);
        registry.add_component(projectile, Velocity(heading * self.projectile.speed), Priority::Deferred);
        registry.add_component(
            projectile,
            Sprite {
                texture: self.projectile.texture,
                order: RenderOrder::Projectile,
            },
            Priority::Deferred,
        );
        registry.add_component(
            projectile,
            Projectile {
                damage: weapon.damage,
                owner: weapon.owner,
                shooter,
            },
            Priority::Deferred,
        );
        registry.add_component(
            projectile,
            Collider {
                width: self.projectile.size.x,
                height: self.projectile.size.y,
            },
            Priority::Deferred,
        );
        registry.add_tag::<ProjectileTag>(projectile, Priority::Deferred);
        tracing::trace!(?shooter, ?projectile, "projectile fired");
    }
}

impl Default for PlayerControllerSystem {
    fn default() -> Self {
        Self::new(ProjectileTemplate::default())
    }
}

impl System for PlayerControllerSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn initialize(&mut self, registry: &mut Registry) {
        if self.subscribed {
            return;
        }
        let held = Rc::clone(&self.held);
        registry.subscribe::<KeyDownEvent>(move |_, event| {
            held.borrow_mut().insert(event.key);
        });
        let held = Rc::clone(&self.held);
        registry.subscribe::<KeyUpEvent>(move |_, event| {
            held.borrow_mut().remove(&event.key);
        });
        self.subscribed = true;
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        self.clock_ms += f64::from(dt) * 1000.0;
        let now = self.clock_ms as u64;
        let heading = self.direction();
        let firing = self.is_held(&[KeyCode::Space]);

        for &entity in self.base.entities() {
            let speed = registry.get_component::<PlayerController>(entity).speed;
            registry.get_component_mut::<Velocity>(entity).0 = heading * speed;

            let anim = registry.get_component_mut::<Animation>(entity);
            if heading.y < 0.0 {
                anim.current_row = ROW_UP;
            } else if heading.y > 0.0 {
                anim.current_row = ROW_DOWN;
            } else if heading.x > 0.0 {
                anim.current_row = ROW_RIGHT;
            } else if heading.x < 0.0 {
                anim.current_row = ROW_LEFT;
            }

            if !firing || heading == Vec2::ZERO {
                continue;
            }
            let Some(weapon) = registry.try_get_component_mut::<Weapon>(entity) else {
                continue;
            };
            if !weapon.ready(now) {
                continue;
            }
            weapon.last_emission_ms = Some(now);
            let weapon = *weapon;
            self.fire(registry, entity, &weapon, heading);
        }
    }
}
