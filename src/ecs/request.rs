use std::any::type_name;
use std::marker::PhantomData;

use super::{Entity, Registry};

/// When a mutation or event takes effect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Queued and applied at the next flush point.
    #[default]
    Deferred,
    /// Applied synchronously. Structural mutation with this priority is
    /// forbidden while a system update or render pass is running.
    Immediate,
}

// ---------------------------------------------------------------------------
// Request — a captured mutation replayed once at the next flush
// ---------------------------------------------------------------------------

pub(crate) trait Request {
    fn execute(self: Box<Self>, registry: &mut Registry);
}

pub(crate) struct AddComponent<T> {
    pub entity: Entity,
    pub component: T,
}

impl<T: 'static> Request for AddComponent<T> {
    fn execute(self: Box<Self>, registry: &mut Registry) {
        if !registry.is_alive(self.entity) {
            tracing::debug!(entity = ?self.entity, component = type_name::<T>(), "skipping add for dead entity");
            return;
        }
        registry.add_component(self.entity, self.component, Priority::Immediate);
    }
}

pub(crate) struct RemoveComponent<T> {
    pub entity: Entity,
    pub _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Request for RemoveComponent<T> {
    fn execute(self: Box<Self>, registry: &mut Registry) {
        if !registry.is_alive(self.entity) {
            tracing::debug!(entity = ?self.entity, component = type_name::<T>(), "skipping remove for dead entity");
            return;
        }
        registry.remove_component::<T>(self.entity, Priority::Immediate);
    }
}

pub(crate) struct AddTag<G> {
    pub entity: Entity,
    pub _marker: PhantomData<fn() -> G>,
}

impl<G: 'static> Request for AddTag<G> {
    fn execute(self: Box<Self>, registry: &mut Registry) {
        if !registry.is_alive(self.entity) || registry.has_tag::<G>(self.entity) {
            tracing::debug!(entity = ?self.entity, tag = type_name::<G>(), "skipping tag add");
            return;
        }
        registry.add_tag::<G>(self.entity, Priority::Immediate);
    }
}

pub(crate) struct RemoveTag<G> {
    pub entity: Entity,
    pub _marker: PhantomData<fn() -> G>,
}

impl<G: 'static> Request for RemoveTag<G> {
    fn execute(self: Box<Self>, registry: &mut Registry) {
        if !registry.has_tag::<G>(self.entity) {
            return;
        }
        registry.remove_tag::<G>(self.entity, Priority::Immediate);
    }
}
