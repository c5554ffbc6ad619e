// src/storage/mod.rs
// DOCUMENTATION: Storage façade shared by both backends
// PURPOSE: Repository-style API selected once from configuration

pub mod db_storage;
pub mod file_storage;
pub mod index;

pub use db_storage::DbStorage;
pub use file_storage::FileStorage;
pub use index::RelationIndex;

use crate::config::{StorageConfig, StorageType};
use crate::errors::StorageError;
use crate::models::{Amenity, Entity, EntityKind, Place, Review};
use async_trait::async_trait;
use std::collections::HashMap;

/// Objects keyed by "<ClassName>.<id>"
pub type ObjectMap = HashMap<String, Entity>;

/// Repository interface implemented by every backend
/// DOCUMENTATION: Lifecycle is construct -> reload -> (new/save/delete/all)* -> close.
/// Every operation except reload fails with StorageError::NoSession until
/// reload has been called, and again after close.
#[async_trait]
pub trait Storage: Send {
    /// All objects of one kind, or of every kind when `kind` is None
    async fn all(&mut self, kind: Option<EntityKind>) -> Result<ObjectMap, StorageError>;

    /// Stage an entity for insertion (or update when its id already exists)
    fn new(&mut self, entity: Entity) -> Result<(), StorageError>;

    /// Persist everything staged since the last save
    async fn save(&mut self) -> Result<(), StorageError>;

    /// Stage removal of an entity and its dependents; None is a no-op
    async fn delete(&mut self, entity: Option<&Entity>) -> Result<(), StorageError>;

    /// Create the schema / load the file and start a fresh session
    async fn reload(&mut self) -> Result<(), StorageError>;

    /// End the session
    async fn close(&mut self) -> Result<(), StorageError>;

    /// Reviews whose place_id is `place_id`
    async fn place_reviews(&mut self, place_id: &str) -> Result<Vec<Review>, StorageError>;

    /// Stored amenities linked to `place`
    async fn place_amenities(&mut self, place: &Place) -> Result<Vec<Amenity>, StorageError>;

    /// One object by kind and id
    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StorageError> {
        let mut objects = self.all(Some(kind)).await?;
        Ok(objects.remove(&kind.key(id)))
    }

    /// Number of objects of one kind, or of every kind
    async fn count(&mut self, kind: Option<EntityKind>) -> Result<usize, StorageError> {
        Ok(self.all(kind).await?.len())
    }
}

/// Kinds covered by an all()/count() call
pub(crate) fn kinds(kind: Option<EntityKind>) -> Vec<EntityKind> {
    match kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    }
}

/// Build the backend selected by the configuration
/// DOCUMENTATION: The returned storage still needs reload() before use
pub async fn open_storage(config: &StorageConfig) -> Result<Box<dyn Storage>, StorageError> {
    config.validate()?;

    match config.storage_type {
        StorageType::Db => {
            log::info!("Using database storage");
            Ok(Box::new(DbStorage::connect(config).await?))
        }
        StorageType::File => {
            log::info!("Using file storage: {}", config.file_path.display());
            Ok(Box::new(FileStorage::with_path(config.file_path.clone())))
        }
    }
}
