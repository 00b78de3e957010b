use crate::components::{Player, Sprite, Transform, Velocity};
use crate::ecs::{Entity, Registry, System, SystemBase};

use super::footprint;

/// Keeps players inside the map and culls anything else that leaves it.
pub struct BoundsSystem {
    base: SystemBase,
    map_width: f32,
    map_height: f32,
}

impl BoundsSystem {
    pub fn new(map_width: u32, map_height: u32) -> Self {
        Self {
            base: SystemBase::new("bounds")
                .require::<Transform>()
                .require::<Velocity>()
                .require::<Sprite>(),
            map_width: map_width as f32,
            map_height: map_height as f32,
        }
    }

    fn clamp_player(&self, registry: &mut Registry, player: Entity) {
        let size = footprint(registry, player);
        let Some(transform) = registry.try_get_component_mut::<Transform>(player) else {
            return;
        };
        let pos = &mut transform.position;

        if pos.x < 0.0 {
            pos.x = 0.0;
        } else if pos.x + size.x > self.map_width {
            pos.x = self.map_width - size.x;
        }

        if pos.y < 0.0 {
            pos.y = 0.0;
        } else if pos.y + size.y > self.map_height {
            pos.y = self.map_height - size.y;
        }
    }
}

impl System for BoundsSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        let players = registry.entities_with_tag::<Player>().to_vec();
        for player in players {
            self.clamp_player(registry, player);
        }

        for &entity in self.base.entities() {
            if registry.has_tag::<Player>(entity) {
                continue;
            }
            let size = footprint(registry, entity);
            let pos = registry.get_component::<Transform>(entity).position;

            let out_x = pos.x + size.x <= 0.0 || pos.x > self.map_width;
            let out_y = pos.y + size.y <= 0.0 || pos.y > self.map_height;
            if out_x || out_y {
                tracing::trace!(?entity, x = pos.x, y = pos.y, "left the map");
                registry.remove_entity(entity);
            }
        }
    }
}
