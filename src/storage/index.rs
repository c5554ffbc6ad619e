// src/storage/index.rs
// DOCUMENTATION: Foreign-key index for the file backend
// PURPOSE: Answer "children of X" lookups without scanning every object

use crate::models::{Entity, EntityKind};
use std::collections::{BTreeSet, HashMap};

/// (child kind, foreign-key column, parent id)
type IndexKey = (EntityKind, &'static str, String);

/// Pseudo-column under which places are indexed by linked amenity id
pub const AMENITY_LINK: &str = "amenity_ids";

/// Every (column, parent id) pair an entity is indexed under
fn references(entity: &Entity) -> Vec<(&'static str, &str)> {
    let mut refs = entity.foreign_keys();
    if let Entity::Place(place) = entity {
        refs.extend(place.amenity_ids.iter().map(|id| (AMENITY_LINK, id.as_str())));
    }
    refs
}

/// Maps a parent id to the ids of entities referencing it
/// DOCUMENTATION: Maintained incrementally; insert() and remove() must be
/// called with the exact entity value that is (or was) stored
#[derive(Debug, Default, Clone)]
pub struct RelationIndex {
    children: HashMap<IndexKey, BTreeSet<String>>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: &Entity) {
        let kind = entity.kind();
        for (column, parent_id) in references(entity) {
            self.children
                .entry((kind, column, parent_id.to_string()))
                .or_default()
                .insert(entity.id().to_string());
        }
    }

    pub fn remove(&mut self, entity: &Entity) {
        let kind = entity.kind();
        for (column, parent_id) in references(entity) {
            let key = (kind, column, parent_id.to_string());
            if let Some(ids) = self.children.get_mut(&key) {
                ids.remove(entity.id());
                if ids.is_empty() {
                    self.children.remove(&key);
                }
            }
        }
    }

    /// Ids of `kind` entities whose `column` points at `parent_id`, sorted
    pub fn children(&self, kind: EntityKind, column: &'static str, parent_id: &str) -> Vec<String> {
        self.children
            .get(&(kind, column, parent_id.to_string()))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
