use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Row;
use tracing::debug;

use super::{ensure_affected, ensure_exists, AvailabilityRepository};
use crate::db::{day_column, format_date, Database};
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{Availability, MealFlags, SetAvailability};

const SELECT_AVAILABILITY: &str =
    "SELECT id, participant_id, trip_id, date, breakfast, lunch, dinner, notes FROM availabilities";

fn map_availability(row: &Row<'_>) -> rusqlite::Result<Availability> {
    Ok(Availability {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        trip_id: row.get(2)?,
        date: day_column(row, 3)?,
        meals: MealFlags {
            breakfast: row.get(4)?,
            lunch: row.get(5)?,
            dinner: row.get(6)?,
        },
        notes: row.get(7)?,
    })
}

pub struct SqliteAvailabilityRepository {
    db: Arc<Database>,
}

impl SqliteAvailabilityRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepository {
    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Availability>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE trip_id = ?1 ORDER BY date, participant_id",
                SELECT_AVAILABILITY
            ))
            .map_err(AppError::db("find_by_trip_id", "availabilities", None))?;

        let records = stmt
            .query_map([trip_id], map_availability)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_by_trip_id", "availabilities", None))?;

        Ok(records)
    }

    async fn find_by_date(&self, trip_id: i64, date: NaiveDate) -> AppResult<Vec<Availability>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE trip_id = ?1 AND substr(date, 1, 10) = ?2 ORDER BY participant_id",
                SELECT_AVAILABILITY
            ))
            .map_err(AppError::db("find_by_date", "availabilities", None))?;

        let records = stmt
            .query_map(rusqlite::params![trip_id, format_date(date)], map_availability)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_by_date", "availabilities", None))?;

        Ok(records)
    }

    async fn upsert(&self, availability: SetAvailability) -> AppResult<Availability> {
        let conn = self.db.lock()?;
        ensure_exists(&conn, "trips", EntityKind::Trip, availability.trip_id)?;
        ensure_exists(&conn, "participants", EntityKind::Participant, availability.participant_id)?;

        let date = format_date(availability.date);
        conn.execute(
            "INSERT INTO availabilities
                (participant_id, trip_id, date, breakfast, lunch, dinner, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (participant_id, date) DO UPDATE SET
                breakfast = excluded.breakfast,
                lunch = excluded.lunch,
                dinner = excluded.dinner,
                notes = excluded.notes",
            rusqlite::params![
                availability.participant_id,
                availability.trip_id,
                date,
                availability.meals.breakfast,
                availability.meals.lunch,
                availability.meals.dinner,
                availability.notes
            ],
        )
        .map_err(AppError::db("upsert", "availabilities", None))?;

        debug!(
            participant_id = availability.participant_id,
            date = %date,
            meals = availability.meals.count(),
            "availability set"
        );

        conn.query_row(
            &format!("{} WHERE participant_id = ?1 AND date = ?2", SELECT_AVAILABILITY),
            rusqlite::params![availability.participant_id, date],
            map_availability,
        )
        .map_err(AppError::db("upsert", "availabilities", None))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.db.lock()?;
        let affected = conn
            .execute("DELETE FROM availabilities WHERE id = ?1", [id])
            .map_err(AppError::db("delete", "availabilities", Some(id)))?;
        ensure_affected(affected, EntityKind::Availability, id)
    }
}
