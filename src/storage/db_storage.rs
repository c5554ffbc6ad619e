// src/storage/db_storage.rs
// DOCUMENTATION: SQL database backend
// PURPOSE: Own the connection pool and one session; expose the Storage API

use crate::config::{init_db_pool, DbEngine, StorageConfig};
use crate::db::{self, EntityRepository, PendingChange, Session};
use crate::errors::StorageError;
use crate::models::{Amenity, Entity, EntityKind, Place, Review};
use crate::storage::{kinds, ObjectMap, Storage};
use async_trait::async_trait;
use sqlx::AnyPool;

/// Database-backed storage
/// DOCUMENTATION: CONNECTED-NO-SESSION after connect(), SESSION-ACTIVE after
/// reload(), back to CONNECTED-NO-SESSION after close()
pub struct DbStorage {
    pool: AnyPool,
    engine: DbEngine,
    session: Option<Session>,
}

impl DbStorage {
    /// Build the pool from configuration
    /// DOCUMENTATION: Drops every table when HBNB_ENV=test. Otherwise no
    /// connection is made until the first query.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let (pool, engine) = init_db_pool(config)?;

        if config.is_test_env() {
            db::drop_all(&pool).await?;
        }

        Ok(DbStorage {
            pool,
            engine,
            session: None,
        })
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> Result<&mut Session, StorageError> {
        self.session.as_mut().ok_or(StorageError::NoSession)
    }

    /// Close the pool after ending the session
    pub async fn shutdown(mut self) -> Result<(), StorageError> {
        if self.session.is_some() {
            self.close().await?;
        }
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn all(&mut self, kind: Option<EntityKind>) -> Result<ObjectMap, StorageError> {
        let engine = self.engine;
        let conn = self.session()?.connection().await?;

        let mut objects = ObjectMap::new();
        for kind in kinds(kind) {
            for entity in EntityRepository::fetch(&mut *conn, engine, kind, None).await? {
                objects.insert(entity.key(), entity);
            }
        }

        log::debug!("all({:?}) returned {} object(s)", kind, objects.len());
        Ok(objects)
    }

    fn new(&mut self, entity: Entity) -> Result<(), StorageError> {
        let session = self.session()?;
        entity.validate()?;
        log::debug!("Staged {}", entity.key());
        session.stage(PendingChange::Upsert(entity));
        Ok(())
    }

    async fn save(&mut self) -> Result<(), StorageError> {
        self.session()?.commit().await
    }

    async fn delete(&mut self, entity: Option<&Entity>) -> Result<(), StorageError> {
        let session = self.session()?;
        if let Some(entity) = entity {
            log::debug!("Staged delete of {}", entity.key());
            session.stage(PendingChange::Delete(entity.kind(), entity.id().to_string()));
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), StorageError> {
        if let Some(mut previous) = self.session.take() {
            previous.rollback().await;
        }

        db::create_all(&self.pool).await?;
        self.session = Some(Session::new(self.pool.clone(), self.engine));

        log::info!("Database session ready");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        match self.session.take() {
            Some(mut session) => {
                if session.pending_len() > 0 {
                    log::warn!("Closing session with {} unsaved change(s)", session.pending_len());
                }
                session.rollback().await;
                log::info!("Database session closed");
                Ok(())
            }
            None => Err(StorageError::NoSession),
        }
    }

    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StorageError> {
        let engine = self.engine;
        let conn = self.session()?.connection().await?;
        EntityRepository::fetch_by_id(conn, engine, kind, id).await
    }

    async fn place_reviews(&mut self, place_id: &str) -> Result<Vec<Review>, StorageError> {
        let engine = self.engine;
        let conn = self.session()?.connection().await?;

        let filter = Some(("place_id", place_id));
        let reviews = EntityRepository::fetch(conn, engine, EntityKind::Review, filter)
            .await?
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::Review(review) => Some(review),
                _ => None,
            })
            .collect();

        Ok(reviews)
    }

    async fn place_amenities(&mut self, place: &Place) -> Result<Vec<Amenity>, StorageError> {
        let engine = self.engine;
        let conn = self.session()?.connection().await?;

        let mut amenities = Vec::new();
        for amenity_id in &place.amenity_ids {
            let found =
                EntityRepository::fetch_by_id(&mut *conn, engine, EntityKind::Amenity, amenity_id)
                    .await?;
            if let Some(Entity::Amenity(amenity)) = found {
                amenities.push(amenity);
            }
        }

        Ok(amenities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageType;
    use crate::models::{City, State, User};
    use tempfile::TempDir;

    fn sqlite_config(dir: &TempDir, environment: &str) -> StorageConfig {
        StorageConfig {
            storage_type: StorageType::Db,
            database_url: Some(format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("hbnb.db").display()
            )),
            environment: environment.to_string(),
            ..StorageConfig::default()
        }
    }

    async fn ready_storage(dir: &TempDir) -> DbStorage {
        let mut storage = DbStorage::connect(&sqlite_config(dir, "development"))
            .await
            .unwrap();
        storage.reload().await.unwrap();
        storage
    }

    /// State, City and User a Place can point at
    fn parents() -> (State, City, User) {
        let state = State::new("California");
        let city = City::new(state.base.id.clone(), "San Francisco");
        let user = User::new("owner@hbnb.io", "secret");
        (state, city, user)
    }

    async fn save_parents(storage: &mut DbStorage) -> (City, User) {
        let (state, city, user) = parents();
        storage.new(state.into()).unwrap();
        storage.new(city.clone().into()).unwrap();
        storage.new(user.clone().into()).unwrap();
        storage.save().await.unwrap();
        (city, user)
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DbStorage::connect(&sqlite_config(&dir, "development"))
            .await
            .unwrap();

        assert_eq!(storage.engine(), DbEngine::Sqlite);
        assert!(!storage.has_session());
        assert!(matches!(storage.all(None).await, Err(StorageError::NoSession)));
        assert!(matches!(
            storage.new(State::new("Nevada").into()),
            Err(StorageError::NoSession)
        ));
        assert!(matches!(storage.save().await, Err(StorageError::NoSession)));
        assert!(matches!(storage.delete(None).await, Err(StorageError::NoSession)));

        storage.reload().await.unwrap();
        assert!(storage.has_session());
        storage.close().await.unwrap();
        assert!(matches!(storage.all(None).await, Err(StorageError::NoSession)));
        assert!(matches!(storage.close().await, Err(StorageError::NoSession)));
    }

    #[tokio::test]
    async fn test_place_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        let place = Entity::from(Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin"));
        storage.new(place.clone()).unwrap();
        storage.save().await.unwrap();

        let places = storage.all(Some(EntityKind::Place)).await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places.get(&place.key()), Some(&place));

        storage.delete(Some(&place)).await.unwrap();
        storage.save().await.unwrap();
        assert!(storage.all(Some(EntityKind::Place)).await.unwrap().is_empty());

        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_all_without_kind_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        storage.new(Amenity::new("Wifi").into()).unwrap();
        storage.new(Place::new(city.base.id.clone(), user.base.id.clone(), "Loft").into()).unwrap();
        storage.save().await.unwrap();

        let objects = storage.all(None).await.unwrap();
        assert_eq!(objects.len(), 5);
        assert_eq!(objects.keys().filter(|k| k.starts_with("Place.")).count(), 1);

        let city = Entity::from(city);
        assert_eq!(objects.get(&city.key()), Some(&city));
    }

    #[tokio::test]
    async fn test_saved_data_survives_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        place.description = Some("By the lake".into());
        place.latitude = Some(37.77);
        place.longitude = Some(-122.41);
        place.price_by_night = 120;
        storage.new(place.clone().into()).unwrap();
        storage.save().await.unwrap();
        storage.shutdown().await.unwrap();

        let mut reopened = ready_storage(&dir).await;
        let found = reopened.get(EntityKind::Place, &place.base.id).await.unwrap();
        assert_eq!(found, Some(Entity::Place(place)));
    }

    #[tokio::test]
    async fn test_unsaved_changes_are_visible_then_discarded_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;

        let state = Entity::from(State::new("Oregon"));
        storage.new(state.clone()).unwrap();

        // autoflush: the session sees its own uncommitted work
        assert_eq!(storage.count(Some(EntityKind::State)).await.unwrap(), 1);

        storage.close().await.unwrap();
        storage.reload().await.unwrap();
        assert_eq!(storage.get(EntityKind::State, state.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_existing_entity() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;

        let mut state = State::new("Nevada");
        storage.new(state.clone().into()).unwrap();
        storage.save().await.unwrap();

        state.name = "Arizona".into();
        state.base.touch();
        storage.new(state.clone().into()).unwrap();
        storage.save().await.unwrap();

        let states = storage.all(Some(EntityKind::State)).await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states.values().next(), Some(&Entity::State(state)));
    }

    #[tokio::test]
    async fn test_delete_place_cascades_to_reviews_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        let wifi = Amenity::new("Wifi");
        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        let wifi_entity = Entity::from(wifi.clone());
        place.link_amenity(&wifi_entity);
        place.link_amenity(&wifi_entity);
        let other = Place::new(city.base.id.clone(), user.base.id.clone(), "Hut");

        storage.new(wifi_entity).unwrap();
        storage.new(place.clone().into()).unwrap();
        storage.new(other.clone().into()).unwrap();
        storage.new(Review::new(place.base.id.clone(), user.base.id.clone(), "Great").into()).unwrap();
        storage.new(Review::new(place.base.id.clone(), user.base.id.clone(), "Cozy").into()).unwrap();
        let kept = Review::new(other.base.id.clone(), user.base.id.clone(), "Small");
        storage.new(kept.clone().into()).unwrap();
        storage.save().await.unwrap();

        assert_eq!(storage.place_reviews(&place.base.id).await.unwrap().len(), 2);
        assert_eq!(storage.place_amenities(&place).await.unwrap(), vec![wifi.clone()]);

        storage.delete(Some(&Entity::from(place.clone()))).await.unwrap();
        storage.save().await.unwrap();

        assert!(storage.place_reviews(&place.base.id).await.unwrap().is_empty());
        assert_eq!(storage.place_reviews(&other.base.id).await.unwrap(), vec![kept]);
        // the amenity itself survives, only the link goes away
        assert_eq!(storage.count(Some(EntityKind::Amenity)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_null_columns_read_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, _) = save_parents(&mut storage).await;

        let mut user = User::new("guest@hbnb.io", "pwd");
        user.first_name = Some("Betty".into());
        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        place.latitude = Some(44.5);

        storage.new(user.clone().into()).unwrap();
        storage.new(place.clone().into()).unwrap();
        storage.save().await.unwrap();

        let found = storage.get(EntityKind::User, &user.base.id).await.unwrap();
        assert_eq!(found, Some(Entity::User(user)));

        let found = storage.get(EntityKind::Place, &place.base.id).await.unwrap();
        let found = found.as_ref().and_then(Entity::as_place).unwrap();
        assert_eq!(found.description, None);
        assert_eq!(found.latitude, Some(44.5));
        assert_eq!(found.longitude, None);
        assert_eq!(found, &place);
    }

    #[tokio::test]
    async fn test_delete_amenity_removes_place_links() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        let wifi = Amenity::new("Wifi");
        let pool = Amenity::new("Pool");
        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        place.link_amenity(&wifi.clone().into());
        place.link_amenity(&pool.clone().into());

        storage.new(wifi.clone().into()).unwrap();
        storage.new(pool.clone().into()).unwrap();
        storage.new(place.clone().into()).unwrap();
        storage.save().await.unwrap();

        storage.delete(Some(&wifi.clone().into())).await.unwrap();
        storage.save().await.unwrap();

        let stored = storage.get(EntityKind::Place, &place.base.id).await.unwrap();
        let stored = stored.as_ref().and_then(Entity::as_place).unwrap();
        assert_eq!(stored.amenity_ids, vec![pool.base.id.clone()]);
        assert_eq!(storage.place_amenities(stored).await.unwrap(), vec![pool]);
        assert_eq!(storage.count(Some(EntityKind::Amenity)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_places_and_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, owner) = save_parents(&mut storage).await;

        let guest = User::new("guest@hbnb.io", "pwd");
        let owned = Place::new(city.base.id.clone(), owner.base.id.clone(), "Cabin");
        let hosted = Place::new(city.base.id.clone(), guest.base.id.clone(), "Hut");
        // reviewed by the guest, removed with the owner's place
        let on_owned = Review::new(owned.base.id.clone(), guest.base.id.clone(), "Nice");
        // written by the owner on the guest's place
        let by_owner = Review::new(hosted.base.id.clone(), owner.base.id.clone(), "Tiny");

        for entity in [
            Entity::from(guest.clone()),
            owned.clone().into(),
            hosted.clone().into(),
            on_owned.into(),
            by_owner.into(),
        ] {
            storage.new(entity).unwrap();
        }
        storage.save().await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 8);

        storage.delete(Some(&owner.into())).await.unwrap();
        storage.save().await.unwrap();

        // state, city, guest and the guest's place remain
        let objects = storage.all(None).await.unwrap();
        assert_eq!(objects.len(), 4);
        assert!(objects.contains_key(&EntityKind::Place.key(&hosted.base.id)));
        assert!(!objects.contains_key(&EntityKind::Place.key(&owned.base.id)));
        assert_eq!(storage.count(Some(EntityKind::Review)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_state_cascades_down_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (state, city, user) = parents();

        let place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        let review = Review::new(place.base.id.clone(), user.base.id.clone(), "Fine");
        for entity in [
            Entity::from(state.clone()),
            city.into(),
            user.clone().into(),
            place.into(),
            review.into(),
        ] {
            storage.new(entity).unwrap();
        }
        storage.save().await.unwrap();

        storage.delete(Some(&state.into())).await.unwrap();
        storage.save().await.unwrap();

        let objects = storage.all(None).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.get(&Entity::from(user.clone()).key()), Some(&Entity::User(user)));
    }

    #[tokio::test]
    async fn test_duplicate_links_are_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        let (city, user) = save_parents(&mut storage).await;

        let wifi = Amenity::new("Wifi");
        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Cabin");
        // bypass link_amenity to simulate a caller editing the list directly
        place.amenity_ids = vec![wifi.base.id.clone(), wifi.base.id.clone()];

        storage.new(wifi.clone().into()).unwrap();
        storage.new(place.clone().into()).unwrap();
        storage.save().await.unwrap();

        let stored = storage.get(EntityKind::Place, &place.base.id).await.unwrap();
        let stored = stored.as_ref().and_then(Entity::as_place).unwrap();
        assert_eq!(stored.amenity_ids, vec![wifi.base.id.clone()]);
    }

    #[tokio::test]
    async fn test_missing_parent_fails_at_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;

        storage.new(Place::new("no-city", "no-user", "Ghost").into()).unwrap();
        let err = storage.save().await.unwrap_err();
        assert!(err.is_database());

        // failed flush rolls everything back; the session is still usable
        assert!(storage.all(Some(EntityKind::Place)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_none_and_unknown_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;

        storage.delete(None).await.unwrap();
        storage.delete(Some(&State::new("Never saved").into())).await.unwrap();
        storage.save().await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_entity_is_rejected_by_new() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;

        let result = storage.new(State::new("").into());
        assert!(matches!(result, Err(StorageError::Validation(_))));
    }

    #[tokio::test]
    async fn test_test_environment_drops_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = ready_storage(&dir).await;
        storage.new(State::new("Texas").into()).unwrap();
        storage.save().await.unwrap();
        storage.shutdown().await.unwrap();

        let mut fresh = DbStorage::connect(&sqlite_config(&dir, "test")).await.unwrap();
        fresh.reload().await.unwrap();
        assert_eq!(fresh.count(None).await.unwrap(), 0);
    }
}
