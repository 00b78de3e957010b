use std::any::{Any, type_name};

use super::Entity;

// ---------------------------------------------------------------------------
// ComponentPool — trait object interface for type-erased component stores
// ---------------------------------------------------------------------------

/// Capability shared by every [`ComponentStore`], whatever its component type.
pub trait ComponentPool {
    fn has_entity(&self, entity: Entity) -> bool;
    fn remove_entity(&mut self, entity: Entity);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// ComponentStore<T> — packed per-component storage
// ---------------------------------------------------------------------------

const EMPTY: u32 = u32::MAX;

/// Packed storage for one component type.
///
/// `index_of` maps entity id → slot, `owners` maps slot → entity and `data`
/// holds the values contiguously. Removal swaps the last slot into the hole,
/// so storage order is not stable across removals.
pub struct ComponentStore<T> {
    index_of: Vec<u32>,
    owners: Vec<Entity>,
    data: Vec<T>,
}

impl<T: 'static> ComponentStore<T> {
    pub fn new() -> Self {
        Self {
            index_of: Vec::new(),
            owners: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Inserts `value`, overwriting in place when the entity already has one.
    pub fn add(&mut self, entity: Entity, value: T) {
        let idx = entity.index();
        if idx >= self.index_of.len() {
            self.index_of.resize(idx + 1, EMPTY);
        }
        if self.index_of[idx] != EMPTY {
            let slot = self.index_of[idx] as usize;
            self.data[slot] = value;
        } else {
            self.index_of[idx] = self.data.len() as u32;
            self.owners.push(entity);
            self.data.push(value);
        }
    }

    /// Swap-with-last removal. Returns `None` when the entity has no entry.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.index_of[entity.index()] = EMPTY;

        let last = self.data.len() - 1;
        if slot != last {
            let moved = self.owners[last];
            self.index_of[moved.index()] = slot as u32;
        }
        self.owners.swap_remove(slot);
        Some(self.data.swap_remove(slot))
    }

    /// # Panics
    /// If the entity has no entry in this store.
    pub fn get(&self, entity: Entity) -> &T {
        match self.try_get(entity) {
            Some(value) => value,
            None => panic!("{entity:?} has no {} component", type_name::<T>()),
        }
    }

    /// # Panics
    /// If the entity has no entry in this store.
    pub fn get_mut(&mut self, entity: Entity) -> &mut T {
        match self.slot(entity) {
            Some(slot) => &mut self.data[slot],
            None => panic!("{entity:?} has no {} component", type_name::<T>()),
        }
    }

    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.data[slot])
    }

    pub fn try_get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.data[slot])
    }

    /// Entities in storage order.
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    /// `(Entity, &T)` pairs in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Entity, &T)> + '_ {
        self.owners.iter().copied().zip(self.data.iter())
    }

    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (Entity, &mut T)> + '_ {
        self.owners.iter().copied().zip(self.data.iter_mut())
    }

    /// Checks the packing invariant: both index maps agree and there are no gaps.
    pub fn is_consistent(&self) -> bool {
        if self.owners.len() != self.data.len() {
            return false;
        }
        let mapped = self.index_of.iter().filter(|&&slot| slot != EMPTY).count();
        mapped == self.data.len()
            && self
                .owners
                .iter()
                .enumerate()
                .all(|(slot, e)| self.index_of.get(e.index()) == Some(&(slot as u32)))
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.index_of.get(entity.index()) {
            Some(&slot) if slot != EMPTY => Some(slot as usize),
            _ => None,
        }
    }
}

impl<T: 'static> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ComponentPool for ComponentStore<T> {
    fn has_entity(&self, entity: Entity) -> bool {
        self.has(entity)
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Health(i32);

    fn e(id: u32) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn add_and_get() {
        let mut store = ComponentStore::new();
        store.add(e(3), Position { x: 1.0, y: 2.0 });
        assert!(store.has(e(3)));
        assert_eq!(store.get(e(3)), &Position { x: 1.0, y: 2.0 });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_overwrites_existing() {
        let mut store = ComponentStore::new();
        store.add(e(0), Health(100));
        store.add(e(0), Health(50));
        assert_eq!(store.get(e(0)), &Health(50));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_mut_modifies_in_place() {
        let mut store = ComponentStore::new();
        store.add(e(1), Health(100));
        store.get_mut(e(1)).0 -= 30;
        assert_eq!(store.get(e(1)), &Health(70));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn get_missing_panics() {
        let store = ComponentStore::<Health>::new();
        store.get(e(7));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut store = ComponentStore::<Health>::new();
        assert!(store.remove(e(2)).is_none());
        store.add(e(0), Health(1));
        assert!(store.remove(e(9)).is_none());
        assert_eq!(store.len(), 1);
    }

    // -- swap-remove integrity ----------------------------------------------

    #[test]
    fn swap_remove_middle_moves_last_into_hole() {
        let mut store = ComponentStore::new();
        store.add(e(0), Position { x: 1.0, y: 0.0 });
        store.add(e(1), Position { x: 2.0, y: 0.0 });
        store.add(e(2), Position { x: 3.0, y: 0.0 });

        assert_eq!(store.remove(e(1)), Some(Position { x: 2.0, y: 0.0 }));

        assert_eq!(store.entities(), &[e(0), e(2)]);
        assert_eq!(store.get(e(0)).x, 1.0);
        assert_eq!(store.get(e(2)).x, 3.0);
        assert!(!store.has(e(1)));
        assert!(store.is_consistent());
    }

    #[test]
    fn swap_remove_first_and_last() {
        let mut store = ComponentStore::new();
        store.add(e(0), Health(1));
        store.add(e(1), Health(2));
        store.add(e(2), Health(3));

        store.remove(e(2));
        assert!(store.is_consistent());
        store.remove(e(0));
        assert!(store.is_consistent());

        assert_eq!(store.entities(), &[e(1)]);
        assert_eq!(store.get(e(1)), &Health(2));
    }

    #[test]
    fn readd_after_remove() {
        let mut store = ComponentStore::new();
        store.add(e(4), Health(1));
        store.remove(e(4));
        store.add(e(4), Health(2));
        assert_eq!(store.get(e(4)), &Health(2));
        assert!(store.is_consistent());
    }

    #[test]
    fn iter_mut_visits_every_slot() {
        let mut store = ComponentStore::new();
        for id in 0..5 {
            store.add(e(id), Health(id as i32));
        }
        for (_, hp) in store.iter_mut() {
            hp.0 *= 10;
        }
        let mut values: Vec<_> = store.iter().map(|(entity, hp)| (entity.id(), hp.0)).collect();
        values.sort();
        assert_eq!(values, vec![(0, 0), (1, 10), (2, 20), (3, 30), (4, 40)]);
    }

    #[test]
    fn pool_trait_object_dispatch() {
        let mut pool: Box<dyn ComponentPool> = Box::new(ComponentStore::<Health>::new());
        pool.as_any_mut()
            .downcast_mut::<ComponentStore<Health>>()
            .unwrap()
            .add(e(5), Health(9));
        assert!(pool.has_entity(e(5)));
        pool.remove_entity(e(5));
        assert!(!pool.has_entity(e(5)));
        assert!(pool.is_empty());
    }
}
