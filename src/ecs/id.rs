use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use parking_lot::RwLock;

pub type ComponentId = u32;
pub type TagId = u32;
pub type EventId = u32;

/// Width of a [`Signature`]; the number of distinct component types a process may use.
pub const MAX_COMPONENTS: usize = 128;

// ---------------------------------------------------------------------------
// Id namespaces — lazily assigned, process-wide, dense per namespace
// ---------------------------------------------------------------------------

#[derive(Default)]
struct IdTable {
    ids: HashMap<TypeId, u32>,
    next: u32,
}

struct IdNamespace {
    kind: &'static str,
    table: RwLock<IdTable>,
}

impl IdNamespace {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            table: RwLock::new(IdTable::default()),
        }
    }

    fn id_of<T: 'static>(&self) -> u32 {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.table.read().ids.get(&key) {
            return id;
        }

        // Another thread may have won the race between the two locks.
        let mut table = self.table.write();
        if let Some(&id) = table.ids.get(&key) {
            return id;
        }
        let id = table.next;
        table.next += 1;
        table.ids.insert(key, id);
        tracing::trace!(kind = self.kind, id, ty = type_name::<T>(), "assigned type id");
        id
    }
}

static COMPONENT_IDS: LazyLock<IdNamespace> = LazyLock::new(|| IdNamespace::new("component"));
static TAG_IDS: LazyLock<IdNamespace> = LazyLock::new(|| IdNamespace::new("tag"));
static EVENT_IDS: LazyLock<IdNamespace> = LazyLock::new(|| IdNamespace::new("event"));

/// Returns the process-wide id of component type `T`, assigning one on first use.
pub fn component_id<T: 'static>() -> ComponentId {
    COMPONENT_IDS.id_of::<T>()
}

/// Returns the process-wide id of tag type `T`. Tags are numbered separately from components.
pub fn tag_id<T: 'static>() -> TagId {
    TAG_IDS.id_of::<T>()
}

/// Returns the process-wide id of event type `T`.
pub fn event_id<T: 'static>() -> EventId {
    EVENT_IDS.id_of::<T>()
}

// ---------------------------------------------------------------------------
// Signature — one bit per component id
// ---------------------------------------------------------------------------

/// Fixed-width component bitset.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(u128);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    /// Signature with the single bit for component type `T` set.
    pub fn of<T: 'static>() -> Self {
        let mut signature = Self::EMPTY;
        signature.set(component_id::<T>());
        signature
    }

    pub fn set(&mut self, id: ComponentId) {
        self.0 |= Self::bit(id);
    }

    pub fn reset(&mut self, id: ComponentId) {
        self.0 &= !Self::bit(id);
    }

    pub fn test(&self, id: ComponentId) -> bool {
        (id as usize) < MAX_COMPONENTS && self.0 & Self::bit(id) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// True when every bit of `required` is also set in `self`.
    pub fn contains(&self, required: Signature) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn union(self, other: Signature) -> Signature {
        Signature(self.0 | other.0)
    }

    /// Iterates the set component ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..MAX_COMPONENTS as ComponentId).filter(|&id| self.test(id))
    }

    fn bit(id: ComponentId) -> u128 {
        assert!(
            (id as usize) < MAX_COMPONENTS,
            "component id {id} exceeds signature width {MAX_COMPONENTS}"
        );
        1u128 << id
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn ids_are_memoized_per_type() {
        let a = component_id::<Alpha>();
        let b = component_id::<Beta>();
        assert_ne!(a, b);
        assert_eq!(component_id::<Alpha>(), a);
        assert_eq!(component_id::<Beta>(), b);
    }

    #[test]
    fn namespaces_are_independent() {
        // Same type, three namespaces: each id is stable within its own table.
        let c = component_id::<Alpha>();
        let t = tag_id::<Alpha>();
        let e = event_id::<Alpha>();
        assert_eq!(component_id::<Alpha>(), c);
        assert_eq!(tag_id::<Alpha>(), t);
        assert_eq!(event_id::<Alpha>(), e);
    }

    #[test]
    fn ids_are_stable_across_threads() {
        let here = component_id::<Beta>();
        let there = std::thread::spawn(component_id::<Beta>).join().unwrap();
        assert_eq!(here, there);
    }

    #[test]
    fn signature_superset_test() {
        let mut entity = Signature::EMPTY;
        entity.set(1);
        entity.set(4);
        entity.set(9);

        let mut required = Signature::EMPTY;
        required.set(1);
        required.set(9);
        assert!(entity.contains(required));

        required.set(2);
        assert!(!entity.contains(required));

        assert!(entity.contains(Signature::EMPTY));
    }

    #[test]
    fn signature_set_and_reset() {
        let mut s = Signature::EMPTY;
        s.set(127);
        assert!(s.test(127));
        assert_eq!(s.count(), 1);
        s.reset(127);
        assert!(s.is_empty());
        assert!(!s.test(500));
    }

    #[test]
    #[should_panic(expected = "exceeds signature width")]
    fn signature_rejects_out_of_range_ids() {
        let mut s = Signature::EMPTY;
        s.set(MAX_COMPONENTS as ComponentId);
    }
}
