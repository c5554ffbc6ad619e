// src/lib.rs
// DOCUMENTATION: Persistence layer for the hbnb rental domain
// PURPOSE: Expose the storage façade, its two backends and the domain models

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod storage;

pub use config::{StorageConfig, StorageType};
pub use errors::StorageError;
pub use models::{Amenity, BaseModel, City, Entity, EntityKind, Place, Review, State, User};
pub use storage::{open_storage, DbStorage, FileStorage, ObjectMap, Storage};
