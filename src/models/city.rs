// src/models/city.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::BaseModel;

/// A city inside a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct City {
    #[serde(flatten)]
    pub base: BaseModel,

    /// Owning state (cities are deleted with their state)
    #[validate(length(min = 1, max = 60))]
    pub state_id: String,

    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct CityRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub state_id: String,
    pub name: String,
}

impl City {
    pub fn new(state_id: impl Into<String>, name: impl Into<String>) -> Self {
        City {
            base: BaseModel::new(),
            state_id: state_id.into(),
            name: name.into(),
        }
    }
}

impl CityRow {
    pub fn into_city(self) -> Result<City, chrono::ParseError> {
        Ok(City {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            state_id: self.state_id,
            name: self.name,
        })
    }
}
