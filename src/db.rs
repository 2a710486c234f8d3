use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Explicit storage handle, shared by all repositories through an `Arc`
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::Config(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(AppError::db("open", "database", None))?;
        info!(path = %path.display(), "database opened");

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::db("open", "database", None))?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AppError::LockPoisoned)
    }

    pub fn initialize(&self) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS trips (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                start_date DATE NOT NULL,
                end_date DATE NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (trip_id) REFERENCES trips(id) ON DELETE CASCADE
            );

            -- Global catalog, not scoped to a trip
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                unit TEXT NOT NULL,
                default_quantity_per_person REAL,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS consumptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL,
                participant_id INTEGER NOT NULL,
                product_id INTEGER NOT NULL,
                date DATE NOT NULL,
                meal_type TEXT NOT NULL,
                quantity REAL NOT NULL CHECK (quantity >= 0),
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (trip_id) REFERENCES trips(id) ON DELETE CASCADE,
                FOREIGN KEY (participant_id) REFERENCES participants(id) ON DELETE CASCADE,
                FOREIGN KEY (product_id) REFERENCES products(id)
            );

            CREATE TABLE IF NOT EXISTS availabilities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                participant_id INTEGER NOT NULL,
                trip_id INTEGER NOT NULL,
                date DATE NOT NULL,
                breakfast INTEGER NOT NULL DEFAULT 0,
                lunch INTEGER NOT NULL DEFAULT 0,
                dinner INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                UNIQUE (participant_id, date),
                FOREIGN KEY (trip_id) REFERENCES trips(id) ON DELETE CASCADE,
                FOREIGN KEY (participant_id) REFERENCES participants(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_participants_trip ON participants(trip_id);
            CREATE INDEX IF NOT EXISTS idx_consumptions_trip ON consumptions(trip_id);
            CREATE INDEX IF NOT EXISTS idx_availabilities_trip ON availabilities(trip_id);
            ",
        )
        .map_err(AppError::db("initialize", "schema", None))?;

        // Reuses the held guard; locking again would deadlock
        Self::migrate_conn(&conn)?;

        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> AppResult<()> {
        add_missing_column(conn, "products", "notes", "TEXT")?;
        add_missing_column(conn, "availabilities", "notes", "TEXT")?;
        Ok(())
    }
}

fn add_missing_column(
    conn: &Connection,
    table: &'static str,
    column: &str,
    ty: &str,
) -> AppResult<()> {
    let columns: Vec<String> = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .and_then(|mut stmt| {
            let names = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>, _>>();
            names
        })
        .map_err(AppError::db("migrate", table, None))?;

    if !columns.iter().any(|c| c == column) {
        conn.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, ty), [])
            .map_err(AppError::db("migrate", table, None))?;
        debug!(table, column, "added missing column");
    }

    Ok(())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a stored date down to its calendar day.
///
/// Older rows may carry a time component (`2024-07-01T09:30:00Z` or
/// `2024-07-01 09:30:00`); only the day is kept.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.date());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Reads a date column, truncating any time-of-day
pub fn day_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_day(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid date: {}", raw).into(),
        )
    })
}

pub fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").map(|ts| ts.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_truncates_time_components() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(parse_day("2024-07-01"), Some(expected));
        assert_eq!(parse_day("2024-07-01T23:59:59Z"), Some(expected));
        assert_eq!(parse_day("2024-07-01T22:00:00-05:00"), Some(expected));
        assert_eq!(parse_day("2024-07-01 08:15:00"), Some(expected));
        assert_eq!(parse_day("2024-07-01T08:15:00.123"), Some(expected));
        assert_eq!(parse_day("yesterday"), None);
    }

    #[test]
    fn initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();

        let conn = db.lock().unwrap();
        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('trips', 'participants', 'products', 'consumptions', 'availabilities')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn migration_adds_notes_columns_to_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    unit TEXT NOT NULL,
                    default_quantity_per_person REAL
                );",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();

        let conn = db.lock().unwrap();
        let has_notes: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('products') WHERE name = 'notes'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_notes, 1);
    }
}
