use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use super::{ensure_affected, row_exists, TripRepository};
use crate::db::{day_column, format_date, format_timestamp, timestamp_column, Database};
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{CreateTrip, Trip};

const SELECT_TRIP: &str =
    "SELECT id, name, description, start_date, end_date, created_at, updated_at FROM trips";

fn map_trip(row: &Row<'_>) -> rusqlite::Result<Trip> {
    Ok(Trip {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        start_date: day_column(row, 3)?,
        end_date: day_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

pub struct SqliteTripRepository {
    db: Arc<Database>,
}

impl SqliteTripRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TripRepository for SqliteTripRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Trip>> {
        let conn = self.db.lock()?;
        conn.query_row(&format!("{} WHERE id = ?1", SELECT_TRIP), [id], map_trip)
            .optional()
            .map_err(AppError::db("find_by_id", "trips", Some(id)))
    }

    async fn find_all(&self) -> AppResult<Vec<Trip>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY start_date DESC, id", SELECT_TRIP))
            .map_err(AppError::db("find_all", "trips", None))?;

        let trips = stmt
            .query_map([], map_trip)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_all", "trips", None))?;

        Ok(trips)
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let conn = self.db.lock()?;
        row_exists(&conn, "trips", id)
    }

    async fn create(&self, trip: CreateTrip) -> AppResult<Trip> {
        trip.validate()?;
        let conn = self.db.lock()?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO trips (name, description, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![
                trip.name.trim(),
                trip.description,
                format_date(trip.start_date),
                format_date(trip.end_date),
                now
            ],
        )
        .map_err(AppError::db("create", "trips", None))?;

        let id = conn.last_insert_rowid();
        debug!(trip_id = id, "trip created");

        conn.query_row(&format!("{} WHERE id = ?1", SELECT_TRIP), [id], map_trip)
            .map_err(AppError::db("create", "trips", Some(id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.db.lock()?;
        let affected = conn
            .execute("DELETE FROM trips WHERE id = ?1", [id])
            .map_err(AppError::db("delete", "trips", Some(id)))?;
        ensure_affected(affected, EntityKind::Trip, id)
    }
}
