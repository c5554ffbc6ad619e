// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use validator::Validate;

use super::base::try_get_nullable;
use super::BaseModel;

/// Account owning places and writing reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    #[serde(flatten)]
    pub base: BaseModel,

    #[validate(length(min = 1, max = 128))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,

    #[validate(length(max = 128))]
    pub first_name: Option<String>,

    #[validate(length(max = 128))]
    pub last_name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct UserRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        User {
            base: BaseModel::new(),
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }
}

impl<'r> FromRow<'r, AnyRow> for UserRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            first_name: try_get_nullable(row, "first_name")?,
            last_name: try_get_nullable(row, "last_name")?,
        })
    }
}

impl UserRow {
    pub fn into_user(self) -> Result<User, chrono::ParseError> {
        Ok(User {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}
