// src/models/state.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::BaseModel;

/// A state grouping cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct State {
    #[serde(flatten)]
    pub base: BaseModel,

    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct StateRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub name: String,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        State {
            base: BaseModel::new(),
            name: name.into(),
        }
    }
}

impl StateRow {
    pub fn into_state(self) -> Result<State, chrono::ParseError> {
        Ok(State {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            name: self.name,
        })
    }
}
