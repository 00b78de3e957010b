//! Entity-component-system core: packed component storage, the tag index,
//! deferred mutation requests, systems and the [`Registry`] that owns them.

pub mod id;
pub mod registry;
pub mod request;
pub mod storage;
pub mod system;
pub mod tags;

use std::fmt;

pub use id::{ComponentId, EventId, MAX_COMPONENTS, Signature, TagId};
pub use registry::Registry;
pub use request::Priority;
pub use storage::{ComponentPool, ComponentStore};
pub use system::{System, SystemBase};
pub use tags::TagIndex;

// ---------------------------------------------------------------------------
// Entity — dense, recycled integer id
// ---------------------------------------------------------------------------

/// Opaque entity handle.
///
/// Ids are handed out densely by the [`Registry`] and recycled once an entity
/// has been fully torn down, so a stale handle may alias a newer entity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    /// Sentinel that is never issued by a registry.
    pub const INVALID: Entity = Entity(u32::MAX);

    /// Wraps a raw id. Mostly useful for driving a [`ComponentStore`] directly.
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Entity({})", self.0)
        } else {
            f.write_str("Entity(INVALID)")
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}
