// src/models/amenity.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::BaseModel;

/// Something a place offers (wifi, pool, ...), linked through place_amenity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: BaseModel,

    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct AmenityRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub name: String,
}

impl Amenity {
    pub fn new(name: impl Into<String>) -> Self {
        Amenity {
            base: BaseModel::new(),
            name: name.into(),
        }
    }
}

impl AmenityRow {
    pub fn into_amenity(self) -> Result<Amenity, chrono::ParseError> {
        Ok(Amenity {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            name: self.name,
        })
    }
}
