// src/models/entity.rs
// DOCUMENTATION: Entity kinds and the tagged union over every model
// PURPOSE: Lookup table from kind to class name, table and cascade rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{Amenity, BaseModel, City, Place, Review, SqlValue, State, User};
use crate::errors::StorageError;

/// Every persisted entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Amenity,
    City,
    Place,
    Review,
    State,
    User,
}

impl EntityKind {
    /// All kinds in table creation order (parents before children)
    pub const ALL: [EntityKind; 6] = [
        EntityKind::State,
        EntityKind::User,
        EntityKind::Amenity,
        EntityKind::City,
        EntityKind::Place,
        EntityKind::Review,
    ];

    /// Class name used in storage keys ("Place.<id>")
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Amenity => "Amenity",
            EntityKind::City => "City",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
            EntityKind::State => "State",
            EntityKind::User => "User",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Amenity => "amenities",
            EntityKind::City => "cities",
            EntityKind::Place => "places",
            EntityKind::Review => "reviews",
            EntityKind::State => "states",
            EntityKind::User => "users",
        }
    }

    /// Child kinds removed together with a row of this kind,
    /// with the child column that references it
    pub fn dependents(&self) -> &'static [(EntityKind, &'static str)] {
        match self {
            EntityKind::State => &[(EntityKind::City, "state_id")],
            EntityKind::City => &[(EntityKind::Place, "city_id")],
            EntityKind::User => &[(EntityKind::Place, "user_id"), (EntityKind::Review, "user_id")],
            EntityKind::Place => &[(EntityKind::Review, "place_id")],
            EntityKind::Amenity | EntityKind::Review => &[],
        }
    }

    /// Column of place_amenity pointing at this kind, if any
    pub fn join_column(&self) -> Option<&'static str> {
        match self {
            EntityKind::Place => Some("place_id"),
            EntityKind::Amenity => Some("amenity_id"),
            _ => None,
        }
    }

    /// Storage key for an id of this kind
    pub fn key(&self, id: &str) -> String {
        format!("{}.{}", self.name(), id)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s || kind.table() == s)
            .ok_or_else(|| StorageError::UnknownKind(s.to_string()))
    }
}

/// Any persisted entity
/// DOCUMENTATION: Serialized with a "__class__" discriminator so the
/// JSON file keeps the class next to each object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    Amenity(Amenity),
    City(City),
    Place(Place),
    Review(Review),
    State(State),
    User(User),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Amenity(_) => EntityKind::Amenity,
            Entity::City(_) => EntityKind::City,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
            Entity::State(_) => EntityKind::State,
            Entity::User(_) => EntityKind::User,
        }
    }

    pub fn base(&self) -> &BaseModel {
        match self {
            Entity::Amenity(e) => &e.base,
            Entity::City(e) => &e.base,
            Entity::Place(e) => &e.base,
            Entity::Review(e) => &e.base,
            Entity::State(e) => &e.base,
            Entity::User(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseModel {
        match self {
            Entity::Amenity(e) => &mut e.base,
            Entity::City(e) => &mut e.base,
            Entity::Place(e) => &mut e.base,
            Entity::Review(e) => &mut e.base,
            Entity::State(e) => &mut e.base,
            Entity::User(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// "<ClassName>.<id>"
    pub fn key(&self) -> String {
        self.kind().key(self.id())
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        match self {
            Entity::Amenity(e) => e.validate()?,
            Entity::City(e) => e.validate()?,
            Entity::Place(e) => e.validate()?,
            Entity::Review(e) => e.validate()?,
            Entity::State(e) => e.validate()?,
            Entity::User(e) => e.validate()?,
        }
        Ok(())
    }

    /// Foreign-key columns of this entity with the id they point at
    pub fn foreign_keys(&self) -> Vec<(&'static str, &str)> {
        match self {
            Entity::City(c) => vec![("state_id", c.state_id.as_str())],
            Entity::Place(p) => vec![("city_id", p.city_id.as_str()), ("user_id", p.user_id.as_str())],
            Entity::Review(r) => vec![("place_id", r.place_id.as_str()), ("user_id", r.user_id.as_str())],
            Entity::Amenity(_) | Entity::State(_) | Entity::User(_) => Vec::new(),
        }
    }

    /// Column/value pairs written to the entity's table
    pub fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        let mut columns = self.base().column_values();
        match self {
            Entity::Amenity(a) => {
                columns.push(("name", SqlValue::from(&a.name)));
            }
            Entity::City(c) => {
                columns.push(("state_id", SqlValue::from(&c.state_id)));
                columns.push(("name", SqlValue::from(&c.name)));
            }
            Entity::Place(p) => {
                columns.push(("city_id", SqlValue::from(&p.city_id)));
                columns.push(("user_id", SqlValue::from(&p.user_id)));
                columns.push(("name", SqlValue::from(&p.name)));
                columns.push(("description", SqlValue::from(&p.description)));
                columns.push(("number_rooms", SqlValue::from(p.number_rooms)));
                columns.push(("number_bathrooms", SqlValue::from(p.number_bathrooms)));
                columns.push(("max_guest", SqlValue::from(p.max_guest)));
                columns.push(("price_by_night", SqlValue::from(p.price_by_night)));
                columns.push(("latitude", SqlValue::from(p.latitude)));
                columns.push(("longitude", SqlValue::from(p.longitude)));
            }
            Entity::Review(r) => {
                columns.push(("place_id", SqlValue::from(&r.place_id)));
                columns.push(("user_id", SqlValue::from(&r.user_id)));
                columns.push(("text", SqlValue::from(&r.text)));
            }
            Entity::State(s) => {
                columns.push(("name", SqlValue::from(&s.name)));
            }
            Entity::User(u) => {
                columns.push(("email", SqlValue::from(&u.email)));
                columns.push(("password", SqlValue::from(&u.password)));
                columns.push(("first_name", SqlValue::from(&u.first_name)));
                columns.push(("last_name", SqlValue::from(&u.last_name)));
            }
        }
        columns
    }

    pub fn as_place(&self) -> Option<&Place> {
        match self {
            Entity::Place(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_review(&self) -> Option<&Review> {
        match self {
            Entity::Review(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_amenity(&self) -> Option<&Amenity> {
        match self {
            Entity::Amenity(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Amenity> for Entity {
    fn from(value: Amenity) -> Self {
        Entity::Amenity(value)
    }
}

impl From<City> for Entity {
    fn from(value: City) -> Self {
        Entity::City(value)
    }
}

impl From<Place> for Entity {
    fn from(value: Place) -> Self {
        Entity::Place(value)
    }
}

impl From<Review> for Entity {
    fn from(value: Review) -> Self {
        Entity::Review(value)
    }
}

impl From<State> for Entity {
    fn from(value: State) -> Self {
        Entity::State(value)
    }
}

impl From<User> for Entity {
    fn from(value: User) -> Self {
        Entity::User(value)
    }
}
