use std::collections::HashMap;

use super::{Entity, TagId};

/// Many-to-many association between entities and tag ids.
///
/// Both directions are kept in insertion order and must always agree:
/// `e` is listed under tag `t` exactly when `t` is listed under `e`.
#[derive(Default)]
pub struct TagIndex {
    tag_to_entities: HashMap<TagId, Vec<Entity>>,
    entity_to_tags: HashMap<Entity, Vec<TagId>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without changing anything if the pair already exists.
    pub fn add(&mut self, entity: Entity, tag: TagId) -> bool {
        if self.has(entity, tag) {
            return false;
        }
        self.tag_to_entities.entry(tag).or_default().push(entity);
        self.entity_to_tags.entry(entity).or_default().push(tag);
        true
    }

    /// Returns `false` if the pair was not present.
    pub fn remove(&mut self, entity: Entity, tag: TagId) -> bool {
        let Some(tags) = self.entity_to_tags.get_mut(&entity) else {
            return false;
        };
        let Some(pos) = tags.iter().position(|&t| t == tag) else {
            return false;
        };
        tags.remove(pos);
        if tags.is_empty() {
            self.entity_to_tags.remove(&entity);
        }

        if let Some(entities) = self.tag_to_entities.get_mut(&tag) {
            if let Some(pos) = entities.iter().position(|&e| e == entity) {
                entities.remove(pos);
            }
        }
        true
    }

    pub fn has(&self, entity: Entity, tag: TagId) -> bool {
        self.entity_to_tags
            .get(&entity)
            .is_some_and(|tags| tags.contains(&tag))
    }

    /// Entities carrying `tag`, oldest first. Empty for a tag nobody has used.
    pub fn entities(&self, tag: TagId) -> &[Entity] {
        self.tag_to_entities.get(&tag).map_or(&[], Vec::as_slice)
    }

    pub fn tags_of(&self, entity: Entity) -> &[TagId] {
        self.entity_to_tags.get(&entity).map_or(&[], Vec::as_slice)
    }

    /// Drops every tag on `entity`. Returns how many were removed.
    pub fn remove_entity(&mut self, entity: Entity) -> usize {
        let Some(tags) = self.entity_to_tags.remove(&entity) else {
            return 0;
        };
        for tag in &tags {
            if let Some(entities) = self.tag_to_entities.get_mut(tag) {
                entities.retain(|&e| e != entity);
            }
        }
        tags.len()
    }

    pub fn clear(&mut self) {
        self.tag_to_entities.clear();
        self.entity_to_tags.clear();
    }

    /// Verifies that both maps describe the same set of pairs.
    pub fn is_consistent(&self) -> bool {
        let forward = self.tag_to_entities.iter().all(|(&tag, entities)| {
            entities.iter().all(|e| {
                self.entity_to_tags
                    .get(e)
                    .is_some_and(|tags| tags.iter().filter(|&&t| t == tag).count() == 1)
            })
        });
        let backward = self.entity_to_tags.iter().all(|(&entity, tags)| {
            tags.iter().all(|t| {
                self.tag_to_entities
                    .get(t)
                    .is_some_and(|entities| entities.iter().filter(|&&e| e == entity).count() == 1)
            })
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: TagId = 0;
    const NPC: TagId = 1;

    fn e(id: u32) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn add_is_visible_from_both_sides() {
        let mut index = TagIndex::new();
        assert!(index.add(e(1), PLAYER));
        assert!(index.has(e(1), PLAYER));
        assert_eq!(index.entities(PLAYER), &[e(1)]);
        assert_eq!(index.tags_of(e(1)), &[PLAYER]);
        assert!(index.is_consistent());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut index = TagIndex::new();
        index.add(e(1), NPC);
        assert!(!index.add(e(1), NPC));
        assert_eq!(index.entities(NPC).len(), 1);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut index = TagIndex::new();
        for id in 0..4 {
            index.add(e(id), NPC);
        }
        assert!(index.remove(e(1), NPC));
        assert_eq!(index.entities(NPC), &[e(0), e(2), e(3)]);
        assert!(!index.has(e(1), NPC));
        assert!(index.is_consistent());
    }

    #[test]
    fn remove_absent_pair_reports_false() {
        let mut index = TagIndex::new();
        index.add(e(0), PLAYER);
        assert!(!index.remove(e(0), NPC));
        assert!(!index.remove(e(5), PLAYER));
        assert!(index.is_consistent());
    }

    #[test]
    fn unknown_tag_yields_empty_slice() {
        let index = TagIndex::new();
        assert!(index.entities(42).is_empty());
        assert!(index.tags_of(e(3)).is_empty());
    }

    #[test]
    fn remove_entity_drops_all_tags() {
        let mut index = TagIndex::new();
        index.add(e(2), PLAYER);
        index.add(e(2), NPC);
        index.add(e(3), NPC);
        assert_eq!(index.remove_entity(e(2)), 2);
        assert!(index.entities(PLAYER).is_empty());
        assert_eq!(index.entities(NPC), &[e(3)]);
        assert!(index.is_consistent());
    }
}
