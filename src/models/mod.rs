// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod amenity;
pub mod base;
pub mod city;
pub mod entity;
pub mod place;
pub mod review;
pub mod state;
pub mod user;

pub use amenity::Amenity;
pub use base::{BaseModel, SqlValue};
pub use city::City;
pub use entity::{Entity, EntityKind};
pub use place::Place;
pub use review::Review;
pub use state::State;
pub use user::User;

pub(crate) use amenity::AmenityRow;
pub(crate) use city::CityRow;
pub(crate) use place::PlaceRow;
pub(crate) use review::ReviewRow;
pub(crate) use state::StateRow;
pub(crate) use user::UserRow;
