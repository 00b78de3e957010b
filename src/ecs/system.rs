use std::collections::BTreeSet;

use super::id::component_id;
use super::{Entity, Registry, Signature};
use crate::renderer::Renderer;

/// Required-component signature plus the set of entities that currently match it.
///
/// The [`Registry`] is the only writer of the member set; it adds an entity
/// when its signature becomes a superset of [`required`](Self::required) and
/// removes it when that stops being true.
#[derive(Debug)]
pub struct SystemBase {
    name: &'static str,
    required: Signature,
    entities: BTreeSet<Entity>,
}

impl SystemBase {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            required: Signature::EMPTY,
            entities: BTreeSet::new(),
        }
    }

    /// Builder form of [`require_component`](Self::require_component).
    pub fn require<T: 'static>(mut self) -> Self {
        self.require_component::<T>();
        self
    }

    pub fn require_component<T: 'static>(&mut self) {
        self.required.set(component_id::<T>());
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn required(&self) -> Signature {
        self.required
    }

    pub fn accepts(&self, signature: Signature) -> bool {
        signature.contains(self.required)
    }

    /// Members in ascending id order.
    pub fn entities(&self) -> &BTreeSet<Entity> {
        &self.entities
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn insert(&mut self, entity: Entity) -> bool {
        self.entities.insert(entity)
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        self.entities.remove(&entity)
    }
}

/// Logic unit driven by the registry once per pass.
///
/// Hooks may read and write components of member entities freely. Structural
/// changes (entities, components, tags) must use [`Priority::Deferred`](super::Priority)
/// while any hook is running; immediate requests panic.
pub trait System: 'static {
    fn base(&self) -> &SystemBase;
    fn base_mut(&mut self) -> &mut SystemBase;

    fn name(&self) -> &'static str {
        self.base().name()
    }

    fn initialize(&mut self, _registry: &mut Registry) {}
    fn update(&mut self, _registry: &mut Registry, _dt: f32) {}
    fn render(&mut self, _registry: &mut Registry, _renderer: &mut dyn Renderer) {}
}
