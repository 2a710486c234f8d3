use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use super::{ensure_affected, ensure_exists, ConsumptionRepository};
use crate::db::{day_column, format_date, format_timestamp, timestamp_column, Database};
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{Consumption, CreateConsumption, UpdateConsumption};

const SELECT_CONSUMPTION: &str =
    "SELECT id, trip_id, participant_id, product_id, date, meal_type, quantity, notes,
            created_at, updated_at
     FROM consumptions";

fn map_consumption(row: &Row<'_>) -> rusqlite::Result<Consumption> {
    Ok(Consumption {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        participant_id: row.get(2)?,
        product_id: row.get(3)?,
        date: day_column(row, 4)?,
        meal_type: row.get(5)?,
        quantity: row.get(6)?,
        notes: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn fetch_one(
    conn: &Connection,
    operation: &'static str,
    id: i64,
) -> AppResult<Option<Consumption>> {
    conn.query_row(
        &format!("{} WHERE id = ?1", SELECT_CONSUMPTION),
        [id],
        map_consumption,
    )
    .optional()
    .map_err(AppError::db(operation, "consumptions", Some(id)))
}

pub struct SqliteConsumptionRepository {
    db: Arc<Database>,
}

impl SqliteConsumptionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConsumptionRepository for SqliteConsumptionRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Consumption>> {
        let conn = self.db.lock()?;
        fetch_one(&conn, "find_by_id", id)
    }

    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Consumption>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} WHERE trip_id = ?1 ORDER BY date, id", SELECT_CONSUMPTION))
            .map_err(AppError::db("find_by_trip_id", "consumptions", None))?;

        let records = stmt
            .query_map([trip_id], map_consumption)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_by_trip_id", "consumptions", None))?;

        Ok(records)
    }

    async fn find_by_date(&self, trip_id: i64, date: NaiveDate) -> AppResult<Vec<Consumption>> {
        let conn = self.db.lock()?;
        // substr tolerates rows stored with a time component
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE trip_id = ?1 AND substr(date, 1, 10) = ?2 ORDER BY id",
                SELECT_CONSUMPTION
            ))
            .map_err(AppError::db("find_by_date", "consumptions", None))?;

        let records = stmt
            .query_map(rusqlite::params![trip_id, format_date(date)], map_consumption)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_by_date", "consumptions", None))?;

        Ok(records)
    }

    async fn create(&self, consumption: CreateConsumption) -> AppResult<Consumption> {
        consumption.validate()?;
        let conn = self.db.lock()?;

        ensure_exists(&conn, "trips", EntityKind::Trip, consumption.trip_id)?;
        ensure_exists(&conn, "participants", EntityKind::Participant, consumption.participant_id)?;
        ensure_exists(&conn, "products", EntityKind::Product, consumption.product_id)?;

        let now = format_timestamp(Utc::now());
        conn.execute(
            "INSERT INTO consumptions
                (trip_id, participant_id, product_id, date, meal_type, quantity, notes,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                consumption.trip_id,
                consumption.participant_id,
                consumption.product_id,
                format_date(consumption.date),
                consumption.meal_type,
                consumption.quantity,
                consumption.notes,
                now
            ],
        )
        .map_err(AppError::db("create", "consumptions", None))?;

        let id = conn.last_insert_rowid();
        debug!(
            consumption_id = id,
            trip_id = consumption.trip_id,
            product_id = consumption.product_id,
            "consumption recorded"
        );

        fetch_one(&conn, "create", id)?.ok_or(AppError::not_found(EntityKind::Consumption, id))
    }

    async fn update(&self, update: UpdateConsumption) -> AppResult<Consumption> {
        update.validate()?;
        let conn = self.db.lock()?;

        let current = fetch_one(&conn, "update", update.id)?
            .ok_or(AppError::not_found(EntityKind::Consumption, update.id))?;

        let quantity = update.quantity.unwrap_or(current.quantity);
        let meal_type = update.meal_type.unwrap_or(current.meal_type);
        let notes = update.notes.unwrap_or(current.notes);

        conn.execute(
            "UPDATE consumptions
             SET quantity = ?1, meal_type = ?2, notes = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![quantity, meal_type, notes, format_timestamp(Utc::now()), update.id],
        )
        .map_err(AppError::db("update", "consumptions", Some(update.id)))?;

        fetch_one(&conn, "update", update.id)?
            .ok_or(AppError::not_found(EntityKind::Consumption, update.id))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.db.lock()?;
        let affected = conn
            .execute("DELETE FROM consumptions WHERE id = ?1", [id])
            .map_err(AppError::db("delete", "consumptions", Some(id)))?;
        ensure_affected(affected, EntityKind::Consumption, id)
    }
}
