//! Application-layer operations, one module per entity plus reports.

pub mod availability;
pub mod categories;
pub mod consumptions;
pub mod participants;
pub mod products;
pub mod reports;
pub mod trips;
