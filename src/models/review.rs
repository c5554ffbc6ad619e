// src/models/review.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::BaseModel;

/// A user's review of a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Review {
    #[serde(flatten)]
    pub base: BaseModel,

    /// Reviewed place (reviews are deleted with their place)
    #[validate(length(min = 1, max = 60))]
    pub place_id: String,

    /// Author (reviews are deleted with their user)
    #[validate(length(min = 1, max = 60))]
    pub user_id: String,

    #[validate(length(min = 1, max = 1024))]
    pub text: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct ReviewRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub place_id: String,
    pub user_id: String,
    pub text: String,
}

impl Review {
    pub fn new(
        place_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Review {
            base: BaseModel::new(),
            place_id: place_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

impl ReviewRow {
    pub fn into_review(self) -> Result<Review, chrono::ParseError> {
        Ok(Review {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            place_id: self.place_id,
            user_id: self.user_id,
            text: self.text,
        })
    }
}
