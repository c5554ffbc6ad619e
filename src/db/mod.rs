// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

pub mod repository;
pub mod schema;
pub mod session;

pub use repository::*;
pub use schema::{create_all, drop_all, PLACE_AMENITY_TABLE};
pub use session::{PendingChange, Session};
