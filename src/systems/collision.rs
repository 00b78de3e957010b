use crate::components::{Collider, Health, Npc, Player, Projectile, ProjectileOwner, ProjectileTag, Transform};
use crate::ecs::{Entity, Priority, Registry, System, SystemBase};
use crate::events::CollisionEvent;
use crate::geometry::Rect;

/// Pairwise AABB test over every collider.
///
/// Each overlapping pair produces one deferred [`CollisionEvent`], delivered
/// after the update pass. The system's own handler resolves player/NPC contact
/// (both die) and projectile hits on NPCs (damage, projectile consumed).
pub struct CollisionSystem {
    base: SystemBase,
    subscribed: bool,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self {
            base: SystemBase::new("collision")
                .require::<Transform>()
                .require::<Collider>(),
            subscribed: false,
        }
    }

    fn bounds(registry: &Registry, entity: Entity) -> Rect {
        let collider = registry.get_component::<Collider>(entity);
        registry
            .get_component::<Transform>(entity)
            .bounds(collider.width, collider.height)
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CollisionSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn initialize(&mut self, registry: &mut Registry) {
        if !self.subscribed {
            registry.subscribe::<CollisionEvent>(on_collision);
            self.subscribed = true;
        }
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        let boxes: Vec<(Entity, Rect)> = self
            .base
            .entities()
            .iter()
            .map(|&e| (e, Self::bounds(registry, e)))
            .collect();

        for (i, &(a, box_a)) in boxes.iter().enumerate() {
            for &(b, box_b) in &boxes[i + 1..] {
                if box_a.intersects(&box_b) {
                    registry.emit(CollisionEvent { a, b }, Priority::Deferred);
                }
            }
        }
    }
}

type TagTest = fn(&Registry, Entity) -> bool;

/// Orders the pair so that the entity passing `first` comes first.
fn match_pair(registry: &Registry, event: &CollisionEvent, first: TagTest, second: TagTest) -> Option<(Entity, Entity)> {
    let (a, b) = (event.a, event.b);
    if first(registry, a) && second(registry, b) {
        Some((a, b))
    } else if first(registry, b) && second(registry, a) {
        Some((b, a))
    } else {
        None
    }
}

fn on_collision(registry: &mut Registry, event: &CollisionEvent) {
    if !registry.is_alive(event.a) || !registry.is_alive(event.b) {
        return;
    }

    if let Some((player, npc)) = match_pair(registry, event, Registry::has_tag::<Player>, Registry::has_tag::<Npc>) {
        tracing::debug!(?player, ?npc, "player touched npc");
        registry.remove_entity(player);
        registry.remove_entity(npc);
        return;
    }

    if let Some((projectile, npc)) = match_pair(registry, event, Registry::has_tag::<ProjectileTag>, Registry::has_tag::<Npc>) {
        let Some(&hit) = registry.try_get_component::<Projectile>(projectile) else {
            return;
        };
        if hit.owner == ProjectileOwner::Npc {
            return;
        }
        registry.remove_entity(projectile);

        let depleted = match registry.try_get_component_mut::<Health>(npc) {
            Some(health) => {
                health.current -= hit.damage;
                health.is_depleted()
            }
            None => false,
        };
        if depleted {
            tracing::debug!(?npc, "npc destroyed");
            registry.remove_entity(npc);
        }
    }
}
