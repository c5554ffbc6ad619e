// src/db/schema.rs
// DOCUMENTATION: Table definitions for every entity kind
// PURPOSE: Create tables if absent and drop them for test runs

use crate::models::EntityKind;
use sqlx::AnyPool;

/// Join table backing the Place <-> Amenity relationship
pub const PLACE_AMENITY_TABLE: &str = "place_amenity";

const BASE_COLUMNS: &str = r#"
    id VARCHAR(60) NOT NULL PRIMARY KEY,
    created_at VARCHAR(32) NOT NULL,
    updated_at VARCHAR(32) NOT NULL"#;

/// CREATE TABLE statement for one kind
/// DOCUMENTATION: Column types are the common subset understood by
/// MySQL, PostgreSQL and SQLite. Timestamps are stored as ISO 8601 text.
pub fn create_table_sql(kind: EntityKind) -> String {
    let columns = match kind {
        EntityKind::State => r#"
    name VARCHAR(128) NOT NULL"#,
        EntityKind::User => r#"
    email VARCHAR(128) NOT NULL,
    password VARCHAR(128) NOT NULL,
    first_name VARCHAR(128),
    last_name VARCHAR(128)"#,
        EntityKind::Amenity => r#"
    name VARCHAR(128) NOT NULL"#,
        EntityKind::City => r#"
    state_id VARCHAR(60) NOT NULL,
    name VARCHAR(128) NOT NULL,
    FOREIGN KEY (state_id) REFERENCES states (id) ON DELETE CASCADE"#,
        EntityKind::Place => r#"
    city_id VARCHAR(60) NOT NULL,
    user_id VARCHAR(60) NOT NULL,
    name VARCHAR(128) NOT NULL,
    description VARCHAR(1024),
    number_rooms BIGINT NOT NULL DEFAULT 0,
    number_bathrooms BIGINT NOT NULL DEFAULT 0,
    max_guest BIGINT NOT NULL DEFAULT 0,
    price_by_night BIGINT NOT NULL DEFAULT 0,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    FOREIGN KEY (city_id) REFERENCES cities (id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE"#,
        EntityKind::Review => r#"
    place_id VARCHAR(60) NOT NULL,
    user_id VARCHAR(60) NOT NULL,
    text VARCHAR(1024) NOT NULL,
    FOREIGN KEY (place_id) REFERENCES places (id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE"#,
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({},{}\n)",
        kind.table(),
        BASE_COLUMNS,
        columns
    )
}

pub fn create_place_amenity_sql() -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    place_id VARCHAR(60) NOT NULL,
    amenity_id VARCHAR(60) NOT NULL,
    PRIMARY KEY (place_id, amenity_id),
    FOREIGN KEY (place_id) REFERENCES places (id) ON DELETE CASCADE,
    FOREIGN KEY (amenity_id) REFERENCES amenities (id) ON DELETE CASCADE
)"#,
        PLACE_AMENITY_TABLE
    )
}

/// Create every table that does not exist yet, parents first
pub async fn create_all(pool: &AnyPool) -> Result<(), sqlx::Error> {
    for kind in EntityKind::ALL {
        sqlx::query(&create_table_sql(kind))
            .execute(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to create table {}: {}", kind.table(), e);
                e
            })?;
    }

    sqlx::query(&create_place_amenity_sql())
        .execute(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create table {}: {}", PLACE_AMENITY_TABLE, e);
            e
        })?;

    log::debug!("Schema ready ({} tables)", EntityKind::ALL.len() + 1);
    Ok(())
}

/// Drop every table, children first
pub async fn drop_all(pool: &AnyPool) -> Result<(), sqlx::Error> {
    let tables = std::iter::once(PLACE_AMENITY_TABLE)
        .chain(EntityKind::ALL.iter().rev().map(|kind| kind.table()));

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to drop table {}: {}", table, e);
                e
            })?;
    }

    log::warn!("Dropped all tables");
    Ok(())
}
