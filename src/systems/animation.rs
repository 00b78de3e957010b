use crate::components::{Animation, Sprite, Transform};
use crate::ecs::{Registry, System, SystemBase};

/// Steps sprite-sheet columns on a clock accumulated from frame deltas.
///
/// A frame advances once strictly more than `frame_ms` has elapsed since the
/// last advance, wrapping back to column 0 after the last one.
pub struct AnimationSystem {
    base: SystemBase,
    clock_ms: f64,
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self {
            base: SystemBase::new("animation")
                .require::<Transform>()
                .require::<Animation>()
                .require::<Sprite>(),
            clock_ms: 0.0,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock_ms as u64
    }
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AnimationSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        self.clock_ms += f64::from(dt) * 1000.0;
        let now = self.elapsed_ms();

        for &entity in self.base.entities() {
            let anim = registry.get_component_mut::<Animation>(entity);
            if anim.columns == 0 {
                continue;
            }
            if now > anim.last_update_ms + anim.frame_ms {
                anim.current_column = (anim.current_column + 1) % anim.columns;
                anim.last_update_ms = now;
            }
        }
    }
}
