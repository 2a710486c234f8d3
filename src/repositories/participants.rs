use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use super::{ensure_affected, ensure_exists, ParticipantRepository};
use crate::db::{format_timestamp, timestamp_column, Database};
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{CreateParticipant, Participant};

const SELECT_PARTICIPANT: &str =
    "SELECT id, trip_id, name, email, notes, created_at FROM participants";

fn map_participant(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        notes: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

pub struct SqliteParticipantRepository {
    db: Arc<Database>,
}

impl SqliteParticipantRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParticipantRepository for SqliteParticipantRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Participant>> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_PARTICIPANT),
            [id],
            map_participant,
        )
        .optional()
        .map_err(AppError::db("find_by_id", "participants", Some(id)))
    }

    async fn find_by_trip_id(&self, trip_id: i64) -> AppResult<Vec<Participant>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} WHERE trip_id = ?1 ORDER BY name", SELECT_PARTICIPANT))
            .map_err(AppError::db("find_by_trip_id", "participants", None))?;

        let participants = stmt
            .query_map([trip_id], map_participant)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_by_trip_id", "participants", None))?;

        Ok(participants)
    }

    async fn count_by_trip_id(&self, trip_id: i64) -> AppResult<u32> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM participants WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )
        .map_err(AppError::db("count_by_trip_id", "participants", None))
    }

    async fn create(&self, participant: CreateParticipant) -> AppResult<Participant> {
        participant.validate()?;
        let conn = self.db.lock()?;
        ensure_exists(&conn, "trips", EntityKind::Trip, participant.trip_id)?;

        conn.execute(
            "INSERT INTO participants (trip_id, name, email, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                participant.trip_id,
                participant.name.trim(),
                participant.email,
                participant.notes,
                format_timestamp(Utc::now())
            ],
        )
        .map_err(AppError::db("create", "participants", None))?;

        let id = conn.last_insert_rowid();
        debug!(participant_id = id, trip_id = participant.trip_id, "participant created");

        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_PARTICIPANT),
            [id],
            map_participant,
        )
        .map_err(AppError::db("create", "participants", Some(id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.db.lock()?;
        let affected = conn
            .execute("DELETE FROM participants WHERE id = ?1", [id])
            .map_err(AppError::db("delete", "participants", Some(id)))?;
        ensure_affected(affected, EntityKind::Participant, id)
    }
}
