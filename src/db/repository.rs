// src/db/repository.rs
// DOCUMENTATION: Database access layer - all SQL queries
// PURPOSE: Table-driven reads and writes for every entity kind

use crate::config::DbEngine;
use crate::db::schema::PLACE_AMENITY_TABLE;
use crate::errors::StorageError;
use crate::models::*;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, FromRow};
use std::collections::HashMap;

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Optional single-column equality filter: (column, value)
pub type Filter<'a> = Option<(&'static str, &'a str)>;

/// Bind one value; NULLs are written inline by the statement builders
fn bind_value(query: AnyQuery<'_>, value: SqlValue) -> AnyQuery<'_> {
    match value {
        SqlValue::Text(Some(v)) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Float(Some(v)) => query.bind(v),
        SqlValue::Text(None) | SqlValue::Float(None) => query,
    }
}

fn is_null(value: &SqlValue) -> bool {
    matches!(value, SqlValue::Text(None) | SqlValue::Float(None))
}

/// Placeholder list for values, with NULL literals in place of missing ones
/// Returns the rendered fragments and the next free parameter number
fn render_values(engine: DbEngine, values: &[&SqlValue], mut next: usize) -> (Vec<String>, usize) {
    let rendered = values
        .iter()
        .map(|value| {
            if is_null(value) {
                "NULL".to_string()
            } else {
                let ph = engine.placeholder(next);
                next += 1;
                ph
            }
        })
        .collect();
    (rendered, next)
}

fn decode_error(e: chrono::ParseError) -> StorageError {
    StorageError::Database(sqlx::Error::Decode(Box::new(e)))
}

/// EntityRepository: All database operations for entities
/// DOCUMENTATION: Every function runs on the connection it is given, which is
/// the session transaction in practice
pub struct EntityRepository;

impl EntityRepository {
    /// Build INSERT statement for an entity
    pub fn insert_sql(engine: DbEngine, entity: &Entity) -> String {
        let columns = entity.column_values();
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let values: Vec<&SqlValue> = columns.iter().map(|(_, value)| value).collect();
        let (rendered, _) = render_values(engine, &values, 1);

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            entity.kind().table(),
            names.join(", "),
            rendered.join(", ")
        )
    }

    /// Build UPDATE statement for an entity (every column except id)
    pub fn update_sql(engine: DbEngine, entity: &Entity) -> String {
        let columns = entity.column_values();
        let settable: Vec<&(&str, SqlValue)> =
            columns.iter().filter(|(name, _)| *name != "id").collect();
        let values: Vec<&SqlValue> = settable.iter().map(|(_, value)| value).collect();
        let (rendered, next) = render_values(engine, &values, 1);

        let assignments: Vec<String> = settable
            .iter()
            .zip(rendered)
            .map(|((name, _), ph)| format!("{} = {}", name, ph))
            .collect();

        format!(
            "UPDATE {} SET {} WHERE id = {}",
            entity.kind().table(),
            assignments.join(", "),
            engine.placeholder(next)
        )
    }

    pub fn select_sql(engine: DbEngine, kind: EntityKind, filter: Filter<'_>) -> String {
        match filter {
            Some((column, _)) => format!(
                "SELECT * FROM {} WHERE {} = {}",
                kind.table(),
                column,
                engine.placeholder(1)
            ),
            None => format!("SELECT * FROM {}", kind.table()),
        }
    }

    /// Check whether a row with this id exists
    pub async fn exists(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        id: &str,
    ) -> Result<bool, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE id = {}",
            kind.table(),
            engine.placeholder(1)
        );

        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_one(conn)
            .await
            .map_err(|e| {
                log::error!("Database error checking {}: {}", kind.key(id), e);
                StorageError::Database(e)
            })?;

        Ok(count > 0)
    }

    /// Insert the entity, or update it when the id is already stored
    /// DOCUMENTATION: Places also rewrite their place_amenity rows
    pub async fn upsert(
        conn: &mut AnyConnection,
        engine: DbEngine,
        entity: &Entity,
    ) -> Result<(), StorageError> {
        let key = entity.key();
        let existing = Self::exists(&mut *conn, engine, entity.kind(), entity.id()).await?;

        let (sql, include_id) = if existing {
            (Self::update_sql(engine, entity), true)
        } else {
            (Self::insert_sql(engine, entity), false)
        };

        let mut query = sqlx::query(&sql);
        for (name, value) in entity.column_values() {
            if existing && name == "id" {
                continue;
            }
            query = bind_value(query, value);
        }
        if include_id {
            query = query.bind(entity.id().to_string());
        }

        query.execute(&mut *conn).await.map_err(|e| {
            log::error!("Failed to write {}: {}", key, e);
            StorageError::Database(e)
        })?;

        if let Entity::Place(place) = entity {
            Self::sync_amenities(&mut *conn, engine, place).await?;
        }

        log::debug!("{} {}", if existing { "Updated" } else { "Inserted" }, key);
        Ok(())
    }

    /// Make place_amenity mirror place.amenity_ids
    pub async fn sync_amenities(
        conn: &mut AnyConnection,
        engine: DbEngine,
        place: &Place,
    ) -> Result<(), StorageError> {
        let place_id = place.base.id.as_str();

        sqlx::query(&format!(
            "DELETE FROM {} WHERE place_id = {}",
            PLACE_AMENITY_TABLE,
            engine.placeholder(1)
        ))
        .bind(place_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Failed to clear amenities of place {}: {}", place_id, e);
            StorageError::Database(e)
        })?;

        let mut amenity_ids: Vec<&String> = place.amenity_ids.iter().collect();
        amenity_ids.sort();
        amenity_ids.dedup();

        let insert_sql = format!(
            "INSERT INTO {} (place_id, amenity_id) VALUES ({})",
            PLACE_AMENITY_TABLE,
            engine.placeholders(1, 2)
        );

        for amenity_id in amenity_ids {
            sqlx::query(&insert_sql)
                .bind(place_id.to_string())
                .bind(amenity_id.clone())
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    log::error!(
                        "Failed to link amenity {} to place {}: {}",
                        amenity_id,
                        place_id,
                        e
                    );
                    StorageError::Database(e)
                })?;
        }

        Ok(())
    }

    async fn load_rows<R>(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        filter: Filter<'_>,
    ) -> Result<Vec<R>, StorageError>
    where
        R: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let sql = Self::select_sql(engine, kind, filter);
        let mut query = sqlx::query_as::<_, R>(&sql);
        if let Some((_, value)) = filter {
            query = query.bind(value.to_string());
        }

        query.fetch_all(conn).await.map_err(|e| {
            log::error!("Failed to query {}: {}", kind.table(), e);
            StorageError::Database(e)
        })
    }

    /// Amenity ids linked to each place id
    async fn amenity_links(
        conn: &mut AnyConnection,
        engine: DbEngine,
        filter: Filter<'_>,
    ) -> Result<HashMap<String, Vec<String>>, StorageError> {
        let sql = match filter {
            Some((_, _)) => format!(
                "SELECT place_id, amenity_id FROM {} WHERE place_id = {}",
                PLACE_AMENITY_TABLE,
                engine.placeholder(1)
            ),
            None => format!("SELECT place_id, amenity_id FROM {}", PLACE_AMENITY_TABLE),
        };

        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        if let Some((_, place_id)) = filter {
            query = query.bind(place_id.to_string());
        }

        let rows = query.fetch_all(conn).await.map_err(|e| {
            log::error!("Failed to query {}: {}", PLACE_AMENITY_TABLE, e);
            StorageError::Database(e)
        })?;

        let mut links: HashMap<String, Vec<String>> = HashMap::new();
        for (place_id, amenity_id) in rows {
            links.entry(place_id).or_default().push(amenity_id);
        }
        Ok(links)
    }

    /// Fetch every entity of a kind, optionally filtered on one column
    pub async fn fetch(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        filter: Filter<'_>,
    ) -> Result<Vec<Entity>, StorageError> {
        let entities = match kind {
            EntityKind::Amenity => Self::load_rows::<AmenityRow>(conn, engine, kind, filter)
                .await?
                .into_iter()
                .map(|row| row.into_amenity().map(Entity::Amenity))
                .collect::<Result<Vec<_>, _>>(),
            EntityKind::City => Self::load_rows::<CityRow>(conn, engine, kind, filter)
                .await?
                .into_iter()
                .map(|row| row.into_city().map(Entity::City))
                .collect::<Result<Vec<_>, _>>(),
            EntityKind::Review => Self::load_rows::<ReviewRow>(conn, engine, kind, filter)
                .await?
                .into_iter()
                .map(|row| row.into_review().map(Entity::Review))
                .collect::<Result<Vec<_>, _>>(),
            EntityKind::State => Self::load_rows::<StateRow>(conn, engine, kind, filter)
                .await?
                .into_iter()
                .map(|row| row.into_state().map(Entity::State))
                .collect::<Result<Vec<_>, _>>(),
            EntityKind::User => Self::load_rows::<UserRow>(conn, engine, kind, filter)
                .await?
                .into_iter()
                .map(|row| row.into_user().map(Entity::User))
                .collect::<Result<Vec<_>, _>>(),
            EntityKind::Place => {
                let rows = Self::load_rows::<PlaceRow>(&mut *conn, engine, kind, filter).await?;
                let link_filter = match filter {
                    Some(("id", place_id)) => Some(("place_id", place_id)),
                    _ => None,
                };
                let mut links = Self::amenity_links(conn, engine, link_filter).await?;

                rows.into_iter()
                    .map(|row| {
                        row.into_place().map(|mut place| {
                            if let Some(ids) = links.remove(&place.base.id) {
                                place.amenity_ids = ids;
                                place.normalize_amenities();
                            }
                            Entity::Place(place)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            }
        };

        entities.map_err(decode_error)
    }

    /// Fetch one entity by id
    pub async fn fetch_by_id(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Entity>, StorageError> {
        let mut found = Self::fetch(conn, engine, kind, Some(("id", id))).await?;
        Ok(found.pop())
    }

    /// Ids of `kind` rows whose `column` equals `parent_id`
    async fn child_ids(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        column: &str,
        parent_id: &str,
    ) -> Result<Vec<String>, StorageError> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = {}",
            kind.table(),
            column,
            engine.placeholder(1)
        );

        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(parent_id.to_string())
            .fetch_all(conn)
            .await
            .map_err(|e| {
                log::error!("Failed to query {} dependents: {}", kind.table(), e);
                StorageError::Database(e)
            })?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Delete a row together with everything that cascades from it
    /// DOCUMENTATION: Dependents are collected breadth-first from the
    /// EntityKind cascade table and removed children first, so it works
    /// whether or not the engine enforces ON DELETE CASCADE.
    /// Returns the number of entity rows removed (0 when the id is unknown).
    pub async fn delete_cascade(
        conn: &mut AnyConnection,
        engine: DbEngine,
        kind: EntityKind,
        id: &str,
    ) -> Result<u64, StorageError> {
        if !Self::exists(&mut *conn, engine, kind, id).await? {
            log::debug!("Nothing to delete for {}", kind.key(id));
            return Ok(0);
        }

        let mut order: Vec<(EntityKind, String)> = Vec::new();
        let mut pending = vec![(kind, id.to_string())];

        while let Some((current_kind, current_id)) = pending.pop() {
            for (child_kind, column) in current_kind.dependents() {
                for child_id in
                    Self::child_ids(&mut *conn, engine, *child_kind, column, &current_id).await?
                {
                    pending.push((*child_kind, child_id));
                }
            }
            order.push((current_kind, current_id));
        }

        let mut removed = 0;
        for (row_kind, row_id) in order.iter().rev() {
            if let Some(column) = row_kind.join_column() {
                sqlx::query(&format!(
                    "DELETE FROM {} WHERE {} = {}",
                    PLACE_AMENITY_TABLE,
                    column,
                    engine.placeholder(1)
                ))
                .bind(row_id.clone())
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    log::error!("Failed to unlink {}: {}", row_kind.key(row_id), e);
                    StorageError::Database(e)
                })?;
            }

            removed += sqlx::query(&format!(
                "DELETE FROM {} WHERE id = {}",
                row_kind.table(),
                engine.placeholder(1)
            ))
            .bind(row_id.clone())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                log::error!("Failed to delete {}: {}", row_kind.key(row_id), e);
                StorageError::Database(e)
            })?
            .rows_affected();
        }

        log::info!("Deleted {} ({} rows including dependents)", kind.key(id), removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql_inlines_nulls() {
        let place = Entity::Place(Place::new("C1", "U1", "Cabin"));
        let sql = EntityRepository::insert_sql(DbEngine::Postgres, &place);

        assert!(sql.starts_with("INSERT INTO places (id, created_at, updated_at, city_id"));
        // description, latitude and longitude are NULL
        assert_eq!(sql.matches("NULL").count(), 3);
        assert!(sql.contains("$10"));
        assert!(!sql.contains("$11"));
    }

    #[test]
    fn test_update_sql_binds_id_last() {
        let mut user = User::new("a@b.c", "pwd");
        user.first_name = Some("Ada".into());
        let sql = EntityRepository::update_sql(DbEngine::Postgres, &Entity::User(user));

        assert_eq!(
            sql,
            "UPDATE users SET created_at = $1, updated_at = $2, email = $3, password = $4, \
             first_name = $5, last_name = NULL WHERE id = $6"
        );
    }

    #[test]
    fn test_select_sql() {
        assert_eq!(
            EntityRepository::select_sql(DbEngine::MySql, EntityKind::Review, Some(("place_id", "P1"))),
            "SELECT * FROM reviews WHERE place_id = ?"
        );
        assert_eq!(
            EntityRepository::select_sql(DbEngine::Sqlite, EntityKind::State, None),
            "SELECT * FROM states"
        );
    }
}
