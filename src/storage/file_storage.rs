// src/storage/file_storage.rs
// DOCUMENTATION: JSON file backend
// PURPOSE: Keep every object in memory and serialize the whole map on save

use crate::errors::StorageError;
use crate::models::{Amenity, Entity, EntityKind, Place, Review};
use crate::storage::index::AMENITY_LINK;
use crate::storage::{kinds, ObjectMap, RelationIndex, Storage};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed storage
/// DOCUMENTATION: The file holds one JSON object mapping "<ClassName>.<id>"
/// to the serialized entity (with its "__class__" tag). Relationship
/// lookups go through a RelationIndex kept in step with the object map.
pub struct FileStorage {
    path: PathBuf,
    objects: ObjectMap,
    index: RelationIndex,
    loaded: bool,
}

impl FileStorage {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        FileStorage {
            path: path.into(),
            objects: ObjectMap::new(),
            index: RelationIndex::new(),
            loaded: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_loaded(&self) -> Result<(), StorageError> {
        if self.loaded {
            Ok(())
        } else {
            Err(StorageError::NoSession)
        }
    }

    /// Insert or replace one object, keeping the index in step
    fn put(&mut self, entity: Entity) {
        if let Some(previous) = self.objects.get(&entity.key()) {
            self.index.remove(previous);
        }
        self.index.insert(&entity);
        self.objects.insert(entity.key(), entity);
    }

    /// Remove one object and everything that cascades from it
    /// Returns the number of objects removed
    fn remove_cascade(&mut self, kind: EntityKind, id: &str) -> usize {
        let mut removed = 0;
        let mut pending = vec![(kind, id.to_string())];

        while let Some((current_kind, current_id)) = pending.pop() {
            let Some(entity) = self.objects.remove(&current_kind.key(&current_id)) else {
                continue;
            };
            self.index.remove(&entity);
            removed += 1;

            for (child_kind, column) in current_kind.dependents() {
                for child_id in self.index.children(*child_kind, *column, &current_id) {
                    pending.push((*child_kind, child_id));
                }
            }

            if current_kind == EntityKind::Amenity {
                self.unlink_amenity_everywhere(&current_id);
            }
        }

        removed
    }

    /// Drop an amenity id from every place that links it
    fn unlink_amenity_everywhere(&mut self, amenity_id: &str) {
        for place_id in self.index.children(EntityKind::Place, AMENITY_LINK, amenity_id) {
            if let Some(mut entity) = self.objects.remove(&EntityKind::Place.key(&place_id)) {
                self.index.remove(&entity);
                if let Entity::Place(place) = &mut entity {
                    place.unlink_amenity(amenity_id);
                }
                self.put(entity);
            }
        }
    }

    async fn read_file(&self) -> Result<ObjectMap, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No storage file at {}, starting empty", self.path.display());
                return Ok(ObjectMap::new());
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", self.path.display(), e);
                return Err(e.into());
            }
        };

        if contents.trim().is_empty() {
            return Ok(ObjectMap::new());
        }

        let stored: BTreeMap<String, Entity> = serde_json::from_str(&contents).map_err(|e| {
            log::error!("Failed to parse {}: {}", self.path.display(), e);
            StorageError::Serialization(e)
        })?;

        // Keys are rebuilt from the objects so a hand-edited file cannot desync them
        Ok(stored
            .into_values()
            .map(|entity| (entity.key(), entity))
            .collect())
    }

    async fn write_file(&self) -> Result<(), StorageError> {
        let ordered: BTreeMap<&String, &Entity> = self.objects.iter().collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(|e| {
            log::error!("Failed to write {}: {}", tmp.display(), e);
            StorageError::Io(e)
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            log::error!("Failed to replace {}: {}", self.path.display(), e);
            StorageError::Io(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn all(&mut self, kind: Option<EntityKind>) -> Result<ObjectMap, StorageError> {
        self.ensure_loaded()?;
        let wanted = kinds(kind);

        Ok(self
            .objects
            .iter()
            .filter(|(_, entity)| wanted.contains(&entity.kind()))
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect())
    }

    fn new(&mut self, mut entity: Entity) -> Result<(), StorageError> {
        self.ensure_loaded()?;
        entity.validate()?;
        if let Entity::Place(place) = &mut entity {
            place.normalize_amenities();
        }
        log::debug!("Added {}", entity.key());
        self.put(entity);
        Ok(())
    }

    async fn save(&mut self) -> Result<(), StorageError> {
        self.ensure_loaded()?;
        self.write_file().await?;
        log::debug!("Saved {} object(s) to {}", self.objects.len(), self.path.display());
        Ok(())
    }

    async fn delete(&mut self, entity: Option<&Entity>) -> Result<(), StorageError> {
        self.ensure_loaded()?;
        if let Some(entity) = entity {
            let removed = self.remove_cascade(entity.kind(), entity.id());
            if removed > 0 {
                log::info!("Deleted {} ({} objects including dependents)", entity.key(), removed);
            }
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), StorageError> {
        let objects = self.read_file().await?;

        self.objects.clear();
        self.index.clear();
        for entity in objects.into_values() {
            self.put(entity);
        }
        self.loaded = true;

        log::info!("Loaded {} object(s) from {}", self.objects.len(), self.path.display());
        Ok(())
    }

    /// Discards unsaved changes; reload() reads the file again
    async fn close(&mut self) -> Result<(), StorageError> {
        self.ensure_loaded()?;
        if !self.objects.is_empty() {
            log::debug!("Dropping {} in-memory object(s)", self.objects.len());
        }
        self.objects.clear();
        self.index.clear();
        self.loaded = false;
        Ok(())
    }

    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StorageError> {
        self.ensure_loaded()?;
        Ok(self.objects.get(&kind.key(id)).cloned())
    }

    async fn place_reviews(&mut self, place_id: &str) -> Result<Vec<Review>, StorageError> {
        self.ensure_loaded()?;

        Ok(self
            .index
            .children(EntityKind::Review, "place_id", place_id)
            .iter()
            .filter_map(|id| self.objects.get(&EntityKind::Review.key(id)))
            .filter_map(Entity::as_review)
            .cloned()
            .collect())
    }

    async fn place_amenities(&mut self, place: &Place) -> Result<Vec<Amenity>, StorageError> {
        self.ensure_loaded()?;

        Ok(place
            .amenity_ids
            .iter()
            .filter_map(|id| self.objects.get(&EntityKind::Amenity.key(id)))
            .filter_map(Entity::as_amenity)
            .cloned()
            .collect())
    }
}
