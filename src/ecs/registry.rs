use std::any::type_name;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::mem;

use super::id::{component_id, tag_id};
use super::request::{AddComponent, AddTag, RemoveComponent, RemoveTag, Request};
use super::{ComponentPool, ComponentStore, Entity, Priority, Signature, System, TagIndex};
use crate::events::EventBus;
use crate::renderer::Renderer;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EntityState {
    Free,
    /// Created but not yet visible to systems.
    Pending,
    Active,
}

/// Central owner of entities, component stores, tags, systems and the event bus.
///
/// Structural mutation comes in two flavours selected by [`Priority`]:
/// `Immediate` applies right away and is only legal outside system passes;
/// `Deferred` is queued and replayed at the next flush, which happens at the
/// start of [`run_systems_initialize`](Self::run_systems_initialize) and
/// [`run_systems_update`](Self::run_systems_update) or on [`flush`](Self::flush).
pub struct Registry {
    next_entity: u32,
    free_entities: VecDeque<Entity>,
    states: Vec<EntityState>,
    signatures: Vec<Signature>,

    pools: Vec<Option<Box<dyn ComponentPool>>>,
    tags: TagIndex,
    systems: Vec<Box<dyn System>>,
    events: EventBus<Registry>,

    created: Vec<Entity>,
    removed: Vec<Entity>,
    add_component_requests: Vec<Box<dyn Request>>,
    remove_component_requests: Vec<Box<dyn Request>>,
    add_tag_requests: Vec<Box<dyn Request>>,
    remove_tag_requests: Vec<Box<dyn Request>>,

    in_update: bool,
    in_render: bool,
    /// Set while the system list is taken out for a pass.
    detached: bool,
    /// Entities whose membership must be re-evaluated once the systems are back.
    dirty: Vec<Entity>,
    /// Entities that lost a component while the systems were out.
    orphan_checks: Vec<Entity>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_entity: 0,
            free_entities: VecDeque::new(),
            states: Vec::new(),
            signatures: Vec::new(),
            pools: Vec::new(),
            tags: TagIndex::new(),
            systems: Vec::new(),
            events: EventBus::new(),
            created: Vec::new(),
            removed: Vec::new(),
            add_component_requests: Vec::new(),
            remove_component_requests: Vec::new(),
            add_tag_requests: Vec::new(),
            remove_tag_requests: Vec::new(),
            in_update: false,
            in_render: false,
            detached: false,
            dirty: Vec::new(),
            orphan_checks: Vec::new(),
        }
    }

    // -- Entity lifecycle ---------------------------------------------------

    /// Allocates an entity id, recycling the oldest freed id first.
    ///
    /// The entity can receive components straight away but only becomes
    /// visible to systems at the next flush.
    pub fn create_entity(&mut self) -> Entity {
        let entity = match self.free_entities.pop_front() {
            Some(entity) => entity,
            None => {
                let entity = Entity::from_raw(self.next_entity);
                self.next_entity += 1;
                self.states.push(EntityState::Free);
                entity
            }
        };
        self.states[entity.index()] = EntityState::Pending;
        self.created.push(entity);
        tracing::trace!(?entity, "entity created");
        entity
    }

    /// Queues `entity` for full teardown at the next flush. Removing an entity
    /// that is not alive, or removing it twice, is harmless.
    pub fn remove_entity(&mut self, entity: Entity) {
        if self.is_alive(entity) {
            self.removed.push(entity);
        }
    }

    /// True from creation until the flush that tears the entity down.
    pub fn is_alive(&self, entity: Entity) -> bool {
        matches!(
            self.states.get(entity.index()),
            Some(EntityState::Pending | EntityState::Active)
        )
    }

    /// True once the entity has been made visible to systems.
    pub fn is_active(&self, entity: Entity) -> bool {
        self.states.get(entity.index()) == Some(&EntityState::Active)
    }

    pub fn entity_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| !matches!(s, EntityState::Free))
            .count()
    }

    /// Component bitset of `entity`; empty for unknown ids.
    pub fn signature(&self, entity: Entity) -> Signature {
        self.signatures
            .get(entity.index())
            .copied()
            .unwrap_or_default()
    }

    // -- Components ---------------------------------------------------------

    /// Adds or overwrites a component.
    ///
    /// # Panics
    /// With `Immediate` priority: during a system pass, or if the entity is not alive.
    pub fn add_component<T: 'static>(&mut self, entity: Entity, component: T, priority: Priority) {
        match priority {
            Priority::Deferred => self
                .add_component_requests
                .push(Box::new(AddComponent { entity, component })),
            Priority::Immediate => self.add_component_now(entity, component),
        }
    }

    /// Removes a component. With `Immediate` priority the entity is queued for
    /// full removal when it is left with no components, or when systems are
    /// registered and it no longer qualifies for any of them.
    ///
    /// # Panics
    /// With `Immediate` priority during a system pass.
    pub fn remove_component<T: 'static>(&mut self, entity: Entity, priority: Priority) {
        match priority {
            Priority::Deferred => self.remove_component_requests.push(Box::new(RemoveComponent::<T> {
                entity,
                _marker: PhantomData,
            })),
            Priority::Immediate => self.remove_component_now::<T>(entity),
        }
    }

    pub fn has_component<T: 'static>(&self, entity: Entity) -> bool {
        self.signature(entity).test(component_id::<T>())
    }

    /// # Panics
    /// If the entity does not have a `T`.
    pub fn get_component<T: 'static>(&self, entity: Entity) -> &T {
        match self.try_get_component(entity) {
            Some(component) => component,
            None => panic!("{entity:?} has no {} component", type_name::<T>()),
        }
    }

    /// # Panics
    /// If the entity does not have a `T`.
    pub fn get_component_mut<T: 'static>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_component_mut(entity) {
            Some(component) => component,
            None => panic!("{entity:?} has no {} component", type_name::<T>()),
        }
    }

    pub fn try_get_component<T: 'static>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>()?.try_get(entity)
    }

    pub fn try_get_component_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = component_id::<T>() as usize;
        self.pools
            .get_mut(id)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()?
            .try_get_mut(entity)
    }

    /// Read access to the packed store of `T`, if any entity ever received one.
    pub fn store<T: 'static>(&self) -> Option<&ComponentStore<T>> {
        let id = component_id::<T>() as usize;
        self.pools
            .get(id)?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    // -- Tags ---------------------------------------------------------------

    /// # Panics
    /// With `Immediate` priority: during a system pass, if the entity is not
    /// alive, or if it already carries the tag.
    pub fn add_tag<G: 'static>(&mut self, entity: Entity, priority: Priority) {
        match priority {
            Priority::Deferred => self.add_tag_requests.push(Box::new(AddTag::<G> {
                entity,
                _marker: PhantomData,
            })),
            Priority::Immediate => {
                self.assert_not_in_pass("add a tag");
                assert!(self.is_alive(entity), "cannot tag dead entity {entity:?}");
                assert!(
                    self.tags.add(entity, tag_id::<G>()),
                    "{entity:?} already has tag {}",
                    type_name::<G>()
                );
            }
        }
    }

    /// # Panics
    /// With `Immediate` priority: during a system pass, or if the entity does
    /// not carry the tag.
    pub fn remove_tag<G: 'static>(&mut self, entity: Entity, priority: Priority) {
        match priority {
            Priority::Deferred => self.remove_tag_requests.push(Box::new(RemoveTag::<G> {
                entity,
                _marker: PhantomData,
            })),
            Priority::Immediate => {
                self.assert_not_in_pass("remove a tag");
                assert!(
                    self.tags.remove(entity, tag_id::<G>()),
                    "{entity:?} does not have tag {}",
                    type_name::<G>()
                );
            }
        }
    }

    pub fn has_tag<G: 'static>(&self, entity: Entity) -> bool {
        self.tags.has(entity, tag_id::<G>())
    }

    /// Entities carrying tag `G`, oldest first. Empty if the tag was never used.
    pub fn entities_with_tag<G: 'static>(&self) -> &[Entity] {
        self.tags.entities(tag_id::<G>())
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    // -- Systems ------------------------------------------------------------

    /// Appends a system. Systems initialize, update and render in the order
    /// they were added. Entities that are already active join it immediately.
    ///
    /// # Panics
    /// During a system pass.
    pub fn add_system<S: System>(&mut self, mut system: S) {
        self.assert_not_in_pass("add a system");
        for (index, state) in self.states.iter().enumerate() {
            if *state == EntityState::Active && system.base().accepts(self.signatures[index]) {
                system.base_mut().insert(Entity::from_raw(index as u32));
            }
        }
        tracing::debug!(
            system = system.name(),
            required = ?system.base().required(),
            members = system.base().len(),
            "system added"
        );
        self.systems.push(Box::new(system));
    }

    /// Registered systems in execution order. Empty while a pass is running.
    pub fn systems(&self) -> impl Iterator<Item = &dyn System> + '_ {
        self.systems.iter().map(|system| system.as_ref())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // -- Events -------------------------------------------------------------

    /// Subscribes `callback` to events of type `E` on the registry's bus.
    pub fn subscribe<E: 'static>(&mut self, callback: impl FnMut(&mut Registry, &E) + 'static) {
        self.events.subscribe(callback);
    }

    /// `Immediate` runs the current subscribers now; `Deferred` buffers the
    /// event until the end of the next update pass.
    pub fn emit<E: 'static>(&mut self, event: E, priority: Priority) {
        match priority {
            Priority::Immediate => {
                let subscribers = self.events.subscribers::<E>();
                subscribers.dispatch(self, &event);
            }
            Priority::Deferred => self.events.enqueue(event),
        }
    }

    /// Delivers every buffered event.
    pub fn process_events(&mut self) {
        for batch in self.events.take_pending() {
            batch.dispatch(self);
        }
    }

    pub fn events(&self) -> &EventBus<Registry> {
        &self.events
    }

    // -- Orchestration ------------------------------------------------------

    /// Flushes pending requests, then initializes every system in order.
    pub fn run_systems_initialize(&mut self) {
        self.flush();
        let mut systems = self.take_systems();
        for system in systems.iter_mut() {
            system.initialize(self);
        }
        self.restore_systems(systems);
    }

    /// Flushes pending requests, updates every system in order, then delivers
    /// the events buffered during the pass.
    pub fn run_systems_update(&mut self, dt: f32) {
        self.flush();
        self.in_update = true;
        let mut systems = self.take_systems();
        for system in systems.iter_mut() {
            system.update(self, dt);
        }
        self.restore_systems(systems);
        self.in_update = false;
        self.process_events();
    }

    /// Renders every system in order. No flush happens here.
    pub fn run_systems_render(&mut self, renderer: &mut dyn Renderer) {
        self.in_render = true;
        let mut systems = self.take_systems();
        for system in systems.iter_mut() {
            system.render(self, renderer);
        }
        self.restore_systems(systems);
        self.in_render = false;
    }

    pub fn is_in_update(&self) -> bool {
        self.in_update
    }

    pub fn is_in_render(&self) -> bool {
        self.in_render
    }

    /// Applies every queued request in a fixed order: entity creations,
    /// component additions, component removals, tag additions, tag removals
    /// and finally entity removals.
    ///
    /// # Panics
    /// During a system pass.
    pub fn flush(&mut self) {
        self.assert_not_in_pass("flush");

        let created = mem::take(&mut self.created);
        let add_components = mem::take(&mut self.add_component_requests);
        let remove_components = mem::take(&mut self.remove_component_requests);
        let add_tags = mem::take(&mut self.add_tag_requests);
        let remove_tags = mem::take(&mut self.remove_tag_requests);

        let summary = (
            created.len(),
            add_components.len(),
            remove_components.len(),
            add_tags.len(),
            remove_tags.len(),
        );

        for entity in created {
            self.activate(entity);
        }
        for request in add_components {
            request.execute(self);
        }
        for request in remove_components {
            request.execute(self);
        }
        for request in add_tags {
            request.execute(self);
        }
        for request in remove_tags {
            request.execute(self);
        }

        let mut destroyed = 0;
        while !self.removed.is_empty() {
            for entity in mem::take(&mut self.removed) {
                if self.destroy(entity) {
                    destroyed += 1;
                }
            }
        }

        if summary != (0, 0, 0, 0, 0) || destroyed > 0 {
            tracing::trace!(
                created = summary.0,
                component_adds = summary.1,
                component_removes = summary.2,
                tag_adds = summary.3,
                tag_removes = summary.4,
                destroyed,
                "registry flushed"
            );
        }
    }

    /// Number of queued requests of every kind, entity creations and removals included.
    pub fn pending_requests(&self) -> usize {
        self.created.len()
            + self.removed.len()
            + self.add_component_requests.len()
            + self.remove_component_requests.len()
            + self.add_tag_requests.len()
            + self.remove_tag_requests.len()
    }

    /// Drops every system, entity, component, tag, queued request and subscription.
    pub fn shutdown(&mut self) {
        self.assert_not_in_pass("shut down");
        tracing::debug!(
            entities = self.entity_count(),
            systems = self.systems.len(),
            "registry shut down"
        );
        self.events.shutdown();
        *self = Self::new();
    }

    // -- Internal helpers ---------------------------------------------------

    fn add_component_now<T: 'static>(&mut self, entity: Entity, component: T) {
        self.assert_not_in_pass("add a component");
        assert!(
            self.is_alive(entity),
            "cannot add component to dead entity {entity:?}"
        );

        let id = component_id::<T>();
        self.store_mut::<T>().add(entity, component);

        let index = entity.index();
        if index >= self.signatures.len() {
            self.signatures.resize(index + 1, Signature::EMPTY);
        }
        self.signatures[index].set(id);

        if self.detached {
            self.dirty.push(entity);
        } else {
            self.sync_membership(entity);
        }
    }

    fn remove_component_now<T: 'static>(&mut self, entity: Entity) {
        self.assert_not_in_pass("remove a component");

        let id = component_id::<T>();
        if !self.signature(entity).test(id) {
            return;
        }
        if let Some(store) = self.pools[id as usize].as_mut() {
            store.remove_entity(entity);
        }
        self.signatures[entity.index()].reset(id);

        if self.detached {
            self.dirty.push(entity);
            self.orphan_checks.push(entity);
            return;
        }
        let qualifies_somewhere = self.sync_membership(entity);
        if self.is_orphaned(entity, qualifies_somewhere) {
            tracing::trace!(?entity, component = type_name::<T>(), "entity orphaned by component removal");
            self.remove_entity(entity);
        }
    }

    /// Re-evaluates `entity` against every registered system: active entities
    /// join the systems that accept their signature and leave the others.
    /// Returns whether any system accepts the signature at all.
    fn sync_membership(&mut self, entity: Entity) -> bool {
        let active = self.is_active(entity);
        let signature = self.signature(entity);
        let mut qualifies_somewhere = false;
        for system in self.systems.iter_mut() {
            let accepts = system.base().accepts(signature);
            qualifies_somewhere |= accepts;
            if accepts && active {
                system.base_mut().insert(entity);
            } else {
                system.base_mut().remove(entity);
            }
        }
        qualifies_somewhere
    }

    fn is_orphaned(&self, entity: Entity, qualifies_somewhere: bool) -> bool {
        self.signature(entity).is_empty() || (!self.systems.is_empty() && !qualifies_somewhere)
    }

    fn store_mut<T: 'static>(&mut self) -> &mut ComponentStore<T> {
        let id = component_id::<T>() as usize;
        if id >= self.pools.len() {
            self.pools.resize_with(id + 1, || None);
        }
        self.pools[id]
            .get_or_insert_with(|| Box::new(ComponentStore::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .expect("type mismatch in component store")
    }

    fn activate(&mut self, entity: Entity) {
        if self.states.get(entity.index()) != Some(&EntityState::Pending) {
            return;
        }
        self.states[entity.index()] = EntityState::Active;
        if self.detached {
            self.dirty.push(entity);
        } else {
            self.sync_membership(entity);
        }
    }

    fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        for pool in self.pools.iter_mut().flatten() {
            pool.remove_entity(entity);
        }
        if let Some(signature) = self.signatures.get_mut(entity.index()) {
            *signature = Signature::EMPTY;
        }
        self.tags.remove_entity(entity);
        for system in self.systems.iter_mut() {
            system.base_mut().remove(entity);
        }
        if self.detached {
            self.dirty.push(entity);
        }
        self.states[entity.index()] = EntityState::Free;
        self.free_entities.push_back(entity);
        tracing::trace!(?entity, "entity destroyed");
        true
    }

    fn take_systems(&mut self) -> Vec<Box<dyn System>> {
        self.detached = true;
        mem::take(&mut self.systems)
    }

    /// Puts the pass's systems back ahead of any added during it, then catches
    /// membership up with the changes made while they were out.
    fn restore_systems(&mut self, systems: Vec<Box<dyn System>>) {
        let added = mem::replace(&mut self.systems, systems);
        self.systems.extend(added);
        self.detached = false;

        let mut dirty = mem::take(&mut self.dirty);
        dirty.sort_unstable();
        dirty.dedup();
        for entity in dirty {
            self.sync_membership(entity);
        }

        let mut orphan_checks = mem::take(&mut self.orphan_checks);
        orphan_checks.sort_unstable();
        orphan_checks.dedup();
        for entity in orphan_checks {
            if !self.is_alive(entity) {
                continue;
            }
            let signature = self.signature(entity);
            let qualifies_somewhere = self.systems.iter().any(|system| system.base().accepts(signature));
            if self.is_orphaned(entity, qualifies_somewhere) {
                tracing::trace!(?entity, "entity orphaned during a system pass");
                self.remove_entity(entity);
            }
        }
    }

    fn assert_not_in_pass(&self, action: &str) {
        assert!(
            !self.in_update && !self.in_render,
            "cannot {action} immediately during a system pass"
        );
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
