//! Repository Module
//!
//! Async lookup and persistence contracts for the five stored entities, with
//! SQLite implementations sharing one injected [`Database`] handle.

pub mod availabilities;
pub mod consumptions;
pub mod participants;
pub mod products;
pub mod trips;

pub use availabilities::SqliteAvailabilityRepository;
pub use consumptions::SqliteConsumptionRepository;
pub use participants::SqliteParticipantRepository;
pub use products::SqliteProductRepository;
pub use trips::SqliteTripRepository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{
    Availability, Consumption, CreateConsumption, CreateParticipant, CreateProduct, CreateTrip,
    Participant, Product, SetAvailability, Trip, UpdateConsumption, UpdateProduct,
};

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Trip>>;
    async fn find_all(&self) -> AppResult<Vec<Trip>>;
    async fn exists(&self, id: i64) -> AppResult<bool>;
    async fn create(&self, trip: CreateTrip) -> AppResult<Trip>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Participant>>;
    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Participant>>;
    async fn count_by_trip_id(&self, trip_id: i64) -> AppResult<u32>;
    async fn create(&self, participant: CreateParticipant) -> AppResult<Participant>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Product>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Product>>;
    async fn exists(&self, id: i64) -> AppResult<bool>;
    async fn create(&self, product: CreateProduct) -> AppResult<Product>;
    async fn update(&self, product: UpdateProduct) -> AppResult<Product>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait ConsumptionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Consumption>>;
    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Consumption>>;
    async fn find_by_date(&self, trip_id: i64, date: NaiveDate) -> AppResult<Vec<Consumption>>;
    async fn create(&self, consumption: CreateConsumption) -> AppResult<Consumption>;
    async fn update(&self, update: UpdateConsumption) -> AppResult<Consumption>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Availability>>;
    async fn find_by_date(&self, trip_id: i64, date: NaiveDate) -> AppResult<Vec<Availability>>;
    /// Inserts or replaces the record for `(participant_id, date)`
    async fn upsert(&self, availability: SetAvailability) -> AppResult<Availability>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// The full set of SQLite repositories over one connection
#[derive(Clone)]
pub struct Repositories {
    pub trips: Arc<dyn TripRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub consumptions: Arc<dyn ConsumptionRepository>,
    pub availabilities: Arc<dyn AvailabilityRepository>,
}

impl Repositories {
    pub fn sqlite(db: Arc<Database>) -> Self {
        Self {
            trips: Arc::new(SqliteTripRepository::new(db.clone())),
            participants: Arc::new(SqliteParticipantRepository::new(db.clone())),
            products: Arc::new(SqliteProductRepository::new(db.clone())),
            consumptions: Arc::new(SqliteConsumptionRepository::new(db.clone())),
            availabilities: Arc::new(SqliteAvailabilityRepository::new(db)),
        }
    }
}

/// Fails with `NotFound` unless `table` holds a row with `id`
pub(crate) fn ensure_exists(
    conn: &Connection,
    table: &'static str,
    entity: EntityKind,
    id: i64,
) -> AppResult<()> {
    if row_exists(conn, table, id)? {
        Ok(())
    } else {
        Err(AppError::not_found(entity, id))
    }
}

pub(crate) fn row_exists(conn: &Connection, table: &'static str, id: i64) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT id FROM {} WHERE id = ?1", table), [id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(AppError::db("exists", table, Some(id)))?;
    Ok(found.is_some())
}

/// Maps a zero-row write to `NotFound`
pub(crate) fn ensure_affected(affected: usize, entity: EntityKind, id: i64) -> AppResult<()> {
    if affected == 0 {
        Err(AppError::not_found(entity, id))
    } else {
        Ok(())
    }
}
