// src/models/base.rs
// DOCUMENTATION: Shared identity and timestamps for every entity
// PURPOSE: BaseModel plus the conversion helpers used by both backends

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{Any, Decode, Row, Type, ValueRef};
use uuid::Uuid;

/// Timestamp layout used in SQL columns (ISO 8601, microseconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Identity and audit fields shared by every entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    /// Unique identifier (UUID v4 text)
    pub id: String,

    /// When the object was created
    pub created_at: DateTime<Utc>,

    /// When the object was last modified
    pub updated_at: DateTime<Utc>,
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseModel {
    /// Fresh identity with both timestamps set to now
    pub fn new() -> Self {
        let now = now();
        BaseModel {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh updated_at
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Current time truncated to microseconds, the precision SQL columns keep
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Read a nullable column
/// DOCUMENTATION: The Any driver types a NULL value as NULL, which no Rust
/// type is compatible with, so NULL is detected on the raw value first
pub(crate) fn try_get_nullable<'r, T>(row: &'r AnyRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Any> + Type<Any>,
{
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    row.try_get(column).map(Some)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// A single column value ready to be bound to a SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(i64),
    Float(Option<f64>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(Some(value.to_string()))
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(Some(value.clone()))
    }
}

impl From<&Option<String>> for SqlValue {
    fn from(value: &Option<String>) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        SqlValue::Float(value)
    }
}

impl BaseModel {
    /// id, created_at and updated_at columns, in table order
    pub fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("id", SqlValue::from(&self.id)),
            ("created_at", SqlValue::Text(Some(format_timestamp(&self.created_at)))),
            ("updated_at", SqlValue::Text(Some(format_timestamp(&self.updated_at)))),
        ]
    }

    /// Rebuild from the raw column text read back from the database
    pub fn from_columns(
        id: String,
        created_at: &str,
        updated_at: &str,
    ) -> Result<Self, chrono::ParseError> {
        Ok(BaseModel {
            id,
            created_at: parse_timestamp(created_at)?,
            updated_at: parse_timestamp(updated_at)?,
        })
    }
}
