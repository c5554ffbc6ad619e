// src/models/place.rs
// DOCUMENTATION: Core data structure for rental listings
// PURPOSE: Defines the Place model, its row mapping and amenity links

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use validator::{Validate, ValidationError};

use super::base::try_get_nullable;
use super::{BaseModel, Entity};

/// Coordinates must be finite; JSON has no NaN or infinity
fn validate_coordinates(place: &Place) -> Result<(), ValidationError> {
    let finite = [place.latitude, place.longitude]
        .iter()
        .flatten()
        .all(|value| value.is_finite());

    if finite {
        Ok(())
    } else {
        Err(ValidationError::new("non_finite_coordinate"))
    }
}

/// Represents a rental listing
/// DOCUMENTATION: Maps to the places table; amenity links live in the
/// place_amenity join table in database mode and in amenity_ids in file mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_coordinates"))]
pub struct Place {
    #[serde(flatten)]
    pub base: BaseModel,

    /// City the place is in (must exist)
    #[validate(length(min = 1, max = 60))]
    pub city_id: String,

    /// Owner of the listing (must exist)
    #[validate(length(min = 1, max = 60))]
    pub user_id: String,

    /// Listing title
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    /// Optional free-text description
    #[validate(length(max = 1024))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub number_rooms: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub number_bathrooms: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub max_guest: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub price_by_night: i64,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    /// Linked Amenity ids, sorted and without duplicates
    #[serde(default)]
    pub amenity_ids: Vec<String>,
}

/// Internal struct for mapping database rows to Place
#[derive(Debug)]
pub(crate) struct PlaceRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub city_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub number_rooms: i64,
    pub number_bathrooms: i64,
    pub max_guest: i64,
    pub price_by_night: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl<'r> FromRow<'r, AnyRow> for PlaceRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(PlaceRow {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            city_id: row.try_get("city_id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            description: try_get_nullable(row, "description")?,
            number_rooms: row.try_get("number_rooms")?,
            number_bathrooms: row.try_get("number_bathrooms")?,
            max_guest: row.try_get("max_guest")?,
            price_by_night: row.try_get("price_by_night")?,
            latitude: try_get_nullable(row, "latitude")?,
            longitude: try_get_nullable(row, "longitude")?,
        })
    }
}

impl PlaceRow {
    /// Convert PlaceRow to Place model; amenity_ids are filled by the caller
    pub fn into_place(self) -> Result<Place, chrono::ParseError> {
        Ok(Place {
            base: BaseModel::from_columns(self.id, &self.created_at, &self.updated_at)?,
            city_id: self.city_id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            number_rooms: self.number_rooms,
            number_bathrooms: self.number_bathrooms,
            max_guest: self.max_guest,
            price_by_night: self.price_by_night,
            latitude: self.latitude,
            longitude: self.longitude,
            amenity_ids: Vec::new(),
        })
    }
}

impl Place {
    /// New place with every counter at 0 and no coordinates
    pub fn new(
        city_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Place {
            base: BaseModel::new(),
            city_id: city_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
            amenity_ids: Vec::new(),
        }
    }

    /// Link an amenity to this place
    /// DOCUMENTATION: Only Amenity entities are accepted; anything else
    /// leaves amenity_ids untouched. Linking twice is a no-op.
    /// Ids are kept sorted so the list reads back identically from place_amenity.
    /// Returns true when a new link was added.
    pub fn link_amenity(&mut self, entity: &Entity) -> bool {
        let Entity::Amenity(amenity) = entity else {
            return false;
        };

        match self.amenity_ids.binary_search(&amenity.base.id) {
            Ok(_) => false,
            Err(pos) => {
                self.amenity_ids.insert(pos, amenity.base.id.clone());
                true
            }
        }
    }

    /// Remove an amenity link, returning whether it was present
    pub fn unlink_amenity(&mut self, amenity_id: &str) -> bool {
        let before = self.amenity_ids.len();
        self.amenity_ids.retain(|id| id != amenity_id);
        self.amenity_ids.len() != before
    }

    /// Restore the sorted, duplicate-free shape of amenity_ids
    /// after it was edited directly
    pub fn normalize_amenities(&mut self) {
        self.amenity_ids.sort();
        self.amenity_ids.dedup();
    }
}
