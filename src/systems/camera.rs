use crate::components::{CameraView, Player, Transform};
use crate::ecs::{Registry, System, SystemBase};

use super::footprint;

/// Centres every camera on the first player, without showing past the map edge.
pub struct CameraFollowSystem {
    base: SystemBase,
    map_width: f32,
    map_height: f32,
}

impl CameraFollowSystem {
    pub fn new(map_width: u32, map_height: u32) -> Self {
        Self {
            base: SystemBase::new("camera-follow")
                .require::<Transform>()
                .require::<CameraView>(),
            map_width: map_width as f32,
            map_height: map_height as f32,
        }
    }
}

impl System for CameraFollowSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        let Some(&player) = registry.entities_with_tag::<Player>().first() else {
            return;
        };
        let Some(player_pos) = registry.try_get_component::<Transform>(player).map(|t| t.position) else {
            return;
        };
        let centre = player_pos + footprint(registry, player) / 2.0;

        for &camera in self.base.entities() {
            let view = *registry.get_component::<CameraView>(camera);
            let (w, h) = (view.width as f32, view.height as f32);
            let max_x = (self.map_width - w).abs();
            let max_y = (self.map_height - h).abs();

            let pos = &mut registry.get_component_mut::<Transform>(camera).position;
            pos.x = (centre.x - w / 2.0).max(0.0).min(max_x);
            pos.y = (centre.y - h / 2.0).max(0.0).min(max_y);
        }
    }
}
