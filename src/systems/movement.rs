use crate::components::{Transform, Velocity};
use crate::ecs::{Registry, System, SystemBase};

/// Integrates velocity into position: `position += velocity * dt`.
pub struct MovementSystem {
    base: SystemBase,
}

impl MovementSystem {
    pub fn new() -> Self {
        Self {
            base: SystemBase::new("movement")
                .require::<Transform>()
                .require::<Velocity>(),
        }
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        for &entity in self.base.entities() {
            let Velocity(velocity) = *registry.get_component::<Velocity>(entity);
            registry.get_component_mut::<Transform>(entity).position += velocity * dt;
        }
    }
}
