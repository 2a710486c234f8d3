//! Shopping list engine: aggregation, variance analysis and export.

pub mod aggregate;
pub mod categories;
pub mod dto;
pub mod export;
pub mod service;
pub mod variance;

pub use dto::*;
pub use service::{ParticipantSource, ShoppingListService, TripSource, UNKNOWN_TRIP_NAME};
